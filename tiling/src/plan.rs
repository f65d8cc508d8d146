//! The tiling descriptor handed to the kernel generator.

use crate::selector::{BlockDims, L0Factors, L1Factors, UbFactors};

/// Flat tiling descriptor.
///
/// Constructed fresh per [`gen_tiling`](crate::gen_tiling) call and filled stage by stage.
/// `m_al1 == 0` / `n_bl1 == 0` mean the operand is fully resident in L1 for the core's whole
/// M / N range (the special template).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TilingPlan {
    // Block dims
    pub batch_dim: usize,
    pub n_dim: usize,
    pub m_dim: usize,
    pub batch_single: usize,
    pub m_single: usize,
    pub n_single: usize,
    pub k_single: usize,

    // L0
    pub m_l0: usize,
    pub n_l0: usize,
    pub k_l0: usize,
    pub db_l0c: usize,

    // L1
    pub k_al1: usize,
    pub k_bl1: usize,
    pub m_al1: usize,
    pub n_bl1: usize,
    pub db_al1: usize,
    pub db_bl1: usize,
    pub hosh: usize,

    // UB
    pub m_aub: usize,
    pub k_aub: usize,
    pub n_cub: usize,
    pub db_aub: usize,
    pub db_cub: usize,

    // Encoding
    pub al1_attach_flag: usize,
    pub bl1_attach_flag: usize,
    pub abkl1_attach_flag: usize,
    pub min_kl1_cmp_kl0: usize,
    pub tiling_id: String,
}

impl TilingPlan {
    pub fn set_block_dims(&mut self, dims: &BlockDims) {
        self.batch_dim = dims.batch_dim;
        self.n_dim = dims.n_dim;
        self.m_dim = dims.m_dim;
        self.batch_single = dims.batch_single;
        self.m_single = dims.m_single;
        self.n_single = dims.n_single;
        self.k_single = dims.k_single;
    }

    pub fn set_l0(&mut self, l0: &L0Factors) {
        self.m_l0 = l0.m_l0;
        self.n_l0 = l0.n_l0;
        self.k_l0 = l0.k_l0;
        self.db_l0c = l0.db_l0c;
    }

    pub fn set_l1(&mut self, l1: &L1Factors) {
        self.k_al1 = l1.k_al1;
        self.k_bl1 = l1.k_bl1;
        self.m_al1 = l1.m_al1;
        self.n_bl1 = l1.n_bl1;
        self.db_al1 = l1.db_al1;
        self.db_bl1 = l1.db_bl1;
        self.hosh = l1.hosh;
    }

    pub fn set_ub(&mut self, ub: &UbFactors) {
        self.m_aub = ub.m_aub;
        self.k_aub = ub.k_aub;
        self.n_cub = ub.n_cub;
        self.db_aub = ub.db_aub;
        self.db_cub = ub.db_cub;
    }

    /// Cores the plan occupies.
    pub const fn used_cores(&self) -> usize {
        self.batch_dim * self.n_dim * self.m_dim
    }
}
