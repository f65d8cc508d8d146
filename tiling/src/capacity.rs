//! Buffer occupancy model.
//!
//! Every byte formula lives here so that the selectors and the final plan check agree on what
//! "fits" means. Sizes are in bytes unless the name says fractals.
//!
//! # L1 input rows
//!
//! L1 holds raw (stride-expanded) `dy` rows rather than an img2col image, so the A operand's
//! footprint is driven by `hosh`, the number of rows one L1 refill must cover:
//!
//! ```text
//! m_ext = m_al1 * m_l0 * block          (flattened dx elements per refill)
//!
//! m_ext <  w, w % m_ext == 0   ->  1 row
//! m_ext <  w, otherwise        ->  2 rows (tile straddles a row boundary)
//! m_ext % w == 0               ->  m_ext / w rows
//! otherwise                    ->  m_ext / w + 2 rows
//!
//! hosh = rows - 1 + kh_dilation
//! ```
//!
//! When the tile holds the full K extent and the whole single-core M range, L1 keeps the
//! complete expanded height instead: `hosh = ho * stride_h`.

use snafu::ensure;

use crate::config::L0_AB_DB;
use crate::context::TilingContext;
use crate::error::{CapacityExceededSnafu, Result};
use crate::plan::TilingPlan;

impl TilingContext<'_> {
    pub const fn l0a_bytes(&self, m_l0: usize, k_l0: usize) -> usize {
        m_l0 * k_l0 * self.hardware.fractal_bytes() * L0_AB_DB
    }

    pub const fn l0b_bytes(&self, n_l0: usize, k_l0: usize) -> usize {
        n_l0 * k_l0 * self.hardware.fractal_bytes() * L0_AB_DB
    }

    pub const fn l0c_bytes(&self, m_l0: usize, n_l0: usize, db_l0c: usize) -> usize {
        m_l0 * n_l0 * self.hardware.acc_fractal_bytes() * db_l0c
    }

    /// One expanded `dy` row across `k` channel blocks.
    pub const fn row_bytes(&self, k: usize) -> usize {
        k * self.hardware.block_size * self.shape.wi() * self.hardware.fp16_bytes
    }

    /// Input rows an L1 refill must hold, see the module docs.
    ///
    /// `m_al1 == 0` stands for the whole single-core M range. Returns 0 for an empty tile.
    pub fn hosh(&self, m_single: usize, k_al1: usize, m_al1: usize, m_l0: usize) -> usize {
        let shape = self.shape;
        let m_blocks = if m_al1 == 0 { m_single } else { m_al1 * m_l0 };
        if k_al1 == shape.co1 && m_blocks >= m_single {
            return shape.ho * shape.stride_h;
        }

        let m_ext = m_blocks * self.block();
        if m_ext == 0 {
            return 0;
        }
        let w = shape.w;
        let rows = if m_ext < w {
            if w % m_ext == 0 { 1 } else { 2 }
        } else if m_ext % w == 0 {
            m_ext / w
        } else {
            m_ext / w + 2
        };
        rows - 1 + shape.kh_dilation()
    }

    pub const fn l1_a_bytes(&self, k_al1: usize, hosh: usize, db_al1: usize) -> usize {
        self.row_bytes(k_al1) * hosh * db_al1
    }

    /// `n_ext` is the N extent in blocks actually resident (`n_bl1 * n_l0`, or `n_single`).
    pub const fn l1_b_bytes(&self, k_bl1: usize, n_ext: usize, db_bl1: usize) -> usize {
        k_bl1 * self.shape.khkw() * n_ext * self.hardware.fractal_bytes() * db_bl1
    }

    /// UB load-in multiplier: strided or dilated inputs are expanded once, unit-stride inputs
    /// go through the amplified path.
    pub const fn loadin_factor(&self) -> usize {
        if self.shape.is_unit_stride() { self.tuning.unit_stride_loadin_factor } else { 1 }
    }

    pub const fn aub_bytes(&self, k_aub: usize, m_aub: usize, db_aub: usize) -> usize {
        self.row_bytes(k_aub) * m_aub * self.loadin_factor() * db_aub
    }

    pub const fn cub_bytes(&self, n_cub: usize, m_l0: usize, db_cub: usize) -> usize {
        n_cub * m_l0 * self.hardware.fractal_bytes() * db_cub
    }

    pub const fn ub_bytes(&self, k_aub: usize, m_aub: usize, n_cub: usize, m_l0: usize, db: (usize, usize)) -> usize {
        self.aub_bytes(k_aub, m_aub, db.0) + self.cub_bytes(n_cub, m_l0, db.1)
    }
}

/// Occupancy of every buffer for a finished plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage {
    pub l0a: usize,
    pub l0b: usize,
    pub l0c: usize,
    pub l1: usize,
    pub ub: usize,
}

impl BufferUsage {
    /// Recompute occupancy from the plan's own fields, honouring the full-residency sentinels.
    pub fn of(ctx: &TilingContext<'_>, plan: &TilingPlan) -> Self {
        let n_ext = if plan.n_bl1 == 0 { plan.n_single } else { plan.n_bl1 * plan.n_l0 };
        Self {
            l0a: ctx.l0a_bytes(plan.m_l0, plan.k_l0),
            l0b: ctx.l0b_bytes(plan.n_l0, plan.k_l0),
            l0c: ctx.l0c_bytes(plan.m_l0, plan.n_l0, plan.db_l0c),
            l1: ctx.l1_a_bytes(plan.k_al1, plan.hosh, plan.db_al1) + ctx.l1_b_bytes(plan.k_bl1, n_ext, plan.db_bl1),
            ub: ctx.ub_bytes(plan.k_aub, plan.m_aub, plan.n_cub, plan.m_l0, (plan.db_aub, plan.db_cub)),
        }
    }

    /// Fail on the first buffer whose occupancy exceeds the hardware capacity.
    pub fn check(&self, ctx: &TilingContext<'_>) -> Result<()> {
        let hw = ctx.hardware;
        let buffers = [
            ("L0A", self.l0a, hw.l0a_bytes),
            ("L0B", self.l0b, hw.l0b_bytes),
            ("L0C", self.l0c, hw.l0c_bytes),
            ("L1", self.l1, hw.l1_bytes),
            ("UB", self.ub, hw.ub_bytes),
        ];
        for (buffer, required, capacity) in buffers {
            ensure!(required <= capacity, CapacityExceededSnafu { buffer, required, capacity });
        }
        Ok(())
    }
}
