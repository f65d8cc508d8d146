//! Attach flags and the decimal tiling id.
//!
//! The kernel generator keys its loop-nest template on a short decimal string. Each digit
//! is one template switch, in this order:
//!
//! | digit | meaning                                   |
//! |-------|-------------------------------------------|
//! | 1     | `db_al1`                                  |
//! | 2     | `db_bl1`                                  |
//! | 3     | `db_l0c`                                  |
//! | 4     | [`AbKl1Flag`]                             |
//! | 5     | A [`AttachFlag`]                          |
//! | 6     | B [`AttachFlag`]                          |
//! | 7     | `min(k_al1, k_bl1) * khkw != k_l0`        |
//! | 8     | stride-expand branch                      |

use strum::{AsRefStr, EnumIter};

use crate::plan::TilingPlan;
use crate::shape::ProblemShape;

/// How many M (or N) tiles one L1 stage covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
pub enum Residency {
    /// Whole single-core range, the `0` sentinel.
    Full,
    Single,
    Multi,
}

impl Residency {
    pub const fn of(multiplier: usize) -> Self {
        match multiplier {
            0 => Self::Full,
            1 => Self::Single,
            _ => Self::Multi,
        }
    }
}

/// Where an operand's L1 load sits in the loop nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
pub enum AttachFlag {
    /// Loaded once for the whole core.
    Full = 0,
    /// Loaded once per outer M/N iteration.
    Outer = 1,
    /// Reloaded inside the K loop.
    KLoop = 2,
}

impl AttachFlag {
    /// `k_full` says the stage holds the operand's complete K extent.
    pub const fn classify(residency: Residency, k_full: bool) -> Self {
        match (residency, k_full) {
            (Residency::Full, true) => Self::Full,
            (_, true) => Self::Outer,
            (_, false) => Self::KLoop,
        }
    }
}

/// Relative K depth of the two L1 stages when both reload inside the K loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
pub enum AbKl1Flag {
    Same = 0,
    ALarger = 1,
    BLarger = 2,
}

/// Template switches derived from a filled plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub al1: AttachFlag,
    pub bl1: AttachFlag,
    pub abkl1: AbKl1Flag,
    pub min_kl1_cmp_kl0: usize,
    pub tiling_id: String,
}

/// Zero out L1 multipliers whose stage covers the whole single-core range.
///
/// M only collapses when the core owns all of M (`m_dim == 1`).
pub fn apply_special_template(plan: &mut TilingPlan) {
    if plan.m_al1 * plan.m_l0 >= plan.m_single && plan.m_dim == 1 {
        plan.m_al1 = 0;
    }
    if plan.n_bl1 * plan.n_l0 >= plan.n_single {
        plan.n_bl1 = 0;
    }
}

/// Derive the attach flags and the tiling id. Expects the special template applied.
pub fn encode(shape: &ProblemShape, plan: &TilingPlan) -> Encoding {
    let al1 = AttachFlag::classify(Residency::of(plan.m_al1), plan.k_al1 == shape.co1);
    let bl1 = AttachFlag::classify(Residency::of(plan.n_bl1), plan.k_bl1 == shape.co1);

    let abkl1 = if al1 == AttachFlag::KLoop && bl1 == AttachFlag::KLoop && plan.m_al1 == 1 && plan.n_bl1 == 1 {
        match plan.k_al1.cmp(&plan.k_bl1) {
            std::cmp::Ordering::Equal => AbKl1Flag::Same,
            std::cmp::Ordering::Greater => AbKl1Flag::ALarger,
            std::cmp::Ordering::Less => AbKl1Flag::BLarger,
        }
    } else {
        AbKl1Flag::Same
    };

    let min_kl1_cmp_kl0 = usize::from(plan.k_al1.min(plan.k_bl1) * shape.khkw() != plan.k_l0);

    let digits = [
        plan.db_al1,
        plan.db_bl1,
        plan.db_l0c,
        abkl1 as usize,
        al1 as usize,
        bl1 as usize,
        min_kl1_cmp_kl0,
        usize::from(shape.stride_expand),
    ];
    let tiling_id = digits.iter().fold(0u64, |id, &digit| id * 10 + digit as u64).to_string();

    Encoding { al1, bl1, abkl1, min_kl1_cmp_kl0, tiling_id }
}

impl TilingPlan {
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.al1_attach_flag = encoding.al1 as usize;
        self.bl1_attach_flag = encoding.bl1 as usize;
        self.abkl1_attach_flag = encoding.abkl1 as usize;
        self.min_kl1_cmp_kl0 = encoding.min_kl1_cmp_kl0;
        self.tiling_id = encoding.tiling_id;
    }
}
