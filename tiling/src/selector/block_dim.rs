//! Multi-core split of batch, N and M.
//!
//! The search balances two data-movement terms: every N split re-reads all of `dy` and every
//! batch/M split re-reads the filter. With `P` cores the continuous optimum is
//! `n* = sqrt(b_size * P / a_size)`, which is then snapped to divisors of `c1` and `batch`.
//! Afterwards M is shrunk so each core keeps a minimum amount of work, and idle cores are
//! handed back to batch or N when the geometry allows.

use itertools::iproduct;
use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::context::TilingContext;
use crate::error::{NoBlockDimsSnafu, Result, ZeroDenominatorSnafu};
use crate::math::{all_divisors, ceil_div, float_equal, nearest_factors};
use crate::shape::ProblemShape;

/// Core split and the per-core extents it implies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockDims {
    pub batch_dim: usize,
    pub n_dim: usize,
    pub m_dim: usize,
    pub batch_single: usize,
    /// M blocks per core.
    pub m_single: usize,
    /// N blocks per core.
    pub n_single: usize,
    /// K blocks per core, never split.
    pub k_single: usize,
}

impl BlockDims {
    pub const fn used_cores(&self) -> usize {
        self.batch_dim * self.n_dim * self.m_dim
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    batch_dim: usize,
    n_dim: usize,
    m_dim: usize,
    cost: f64,
}

impl Candidate {
    const fn cores(&self) -> usize {
        self.batch_dim * self.n_dim * self.m_dim
    }

    /// More cores first, then lower movement cost, then the larger batch × N split.
    fn beats(&self, other: &Self, epsilon: f64) -> bool {
        if self.cores() != other.cores() {
            return self.cores() > other.cores();
        }
        let noise = epsilon * other.cost.abs().max(1.0);
        if (self.cost - other.cost).abs() > noise {
            return self.cost < other.cost;
        }
        self.batch_dim * self.n_dim > other.batch_dim * other.n_dim
    }
}

/// Choose `(batch_dim, n_dim, m_dim)` for the shape.
///
/// # Errors
///
/// - [`NoBlockDims`](crate::TilingError::NoBlockDims) for a zero core count
/// - [`ZeroDenominator`](crate::TilingError::ZeroDenominator) when the `dy` volume is zero
pub fn select_block_dims(ctx: &TilingContext<'_>) -> Result<BlockDims> {
    let shape = ctx.shape;
    let core_num = ctx.hardware.core_num;
    ensure!(core_num > 0, NoBlockDimsSnafu { core_num });

    let m1 = shape.m1(ctx.block());

    // Fewer work items than cores: give every channel block its own core.
    if shape.batch * m1 * shape.c1 < core_num {
        let start = m1.min(core_num / (shape.batch * shape.c1)).max(1);
        let (m_dim, _) = tune_m_dim(ctx, start, m1, 1);
        tracing::trace!(m_dim, "small problem, N fully split");
        return finalize(shape, m1, shape.batch, shape.c1, m_dim);
    }

    let best = search_split(ctx, m1)?;
    let n_single = shape.c1 / best.n_dim;
    let (mut m_dim, min_hw) = tune_m_dim(ctx, best.m_dim, m1, n_single);
    let (mut batch_dim, mut n_dim) = (best.batch_dim, best.n_dim);

    if !min_hw {
        (batch_dim, m_dim) = rebalance_batch(shape, core_num, m1, n_dim, batch_dim, m_dim);
        (n_dim, m_dim) = rebalance_n(shape, ctx.block(), n_dim, m_dim);
    }

    finalize(shape, m1, batch_dim, n_dim, m_dim)
}

fn search_split(ctx: &TilingContext<'_>, m1: usize) -> Result<Candidate> {
    let shape = ctx.shape;
    let core_num = ctx.hardware.core_num;

    let kh_dilation = shape.kh_dilation();
    let a_rows = if kh_dilation > shape.stride_h { ceil_div(kh_dilation, shape.stride_h) } else { 1 };
    let a_size = (shape.batch * shape.co * shape.ho * shape.wo * a_rows) as f64;
    let b_size = (shape.c * shape.co * shape.kh * shape.kw) as f64;
    ensure!(!float_equal(a_size, 0.0), ZeroDenominatorSnafu { stage: "block_dim", what: "dy volume" });

    let cores = core_num as f64;
    let n_real = (b_size * cores / a_size).sqrt().clamp(1.0, cores);
    let batch_real = (shape.batch as f64).min(cores / n_real).clamp(1.0, cores);

    let (n_ceil, n_floor) = nearest_factors(n_real as usize, shape.c1)?;
    let (batch_ceil, batch_floor) = nearest_factors(batch_real as usize, shape.batch)?;

    let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();
    for (batch_dim, n_dim) in iproduct!([batch_floor, batch_ceil], [n_floor, n_ceil]) {
        if batch_dim * n_dim > core_num {
            continue;
        }
        let m_dim = (core_num / (batch_dim * n_dim)).min(m1).max(1);
        let cost = a_size * n_dim as f64 + b_size * (batch_dim * m_dim) as f64;
        tracing::trace!(batch_dim, n_dim, m_dim, cost, "block dim candidate");
        candidates.push(Candidate { batch_dim, n_dim, m_dim, cost });
    }

    let epsilon = ctx.tuning.cost_epsilon;
    candidates
        .into_iter()
        .reduce(|best, cand| if cand.beats(&best, epsilon) { cand } else { best })
        .context(NoBlockDimsSnafu { core_num })
}

/// Shrink `m_dim` until every core computes at least `min_core_workload` units.
///
/// Returns the tuned value and whether the floor was hit.
pub(crate) fn tune_m_dim(ctx: &TilingContext<'_>, m_dim: usize, m1: usize, n_single: usize) -> (usize, bool) {
    let floor = ctx.tuning.min_core_workload;
    let k2 = ctx.shape.k2();
    let units = |m: usize| ceil_div(m1, m) * n_single * k2;

    if units(m_dim) >= floor {
        return (m_dim, false);
    }
    let tuned = (1..m_dim).rev().find(|&m| units(m) >= floor).unwrap_or(1);
    (tuned, true)
}

/// Hand idle cores to batch when a batch divisor lines up with the expanded input height.
pub(crate) fn rebalance_batch(
    shape: &ProblemShape,
    core_num: usize,
    m1: usize,
    n_dim: usize,
    batch_dim: usize,
    m_dim: usize,
) -> (usize, usize) {
    let available = core_num / n_dim;
    if batch_dim * m_dim >= available {
        return (batch_dim, m_dim);
    }

    let expanded_height = shape.stride_h * shape.ho;
    all_divisors(available)
        .into_iter()
        .rev()
        .map(|d| (d, available / d))
        .find(|&(d, m)| shape.batch % d == 0 && m <= m1 && expanded_height % m == 0)
        .unwrap_or((batch_dim, m_dim))
}

/// Move M splits to N while each core's spatial extent still fits in one block row.
pub(crate) fn rebalance_n(shape: &ProblemShape, block: usize, n_dim: usize, m_dim: usize) -> (usize, usize) {
    let plane = shape.h * shape.w;
    if ceil_div(plane, m_dim) > block {
        return (n_dim, m_dim);
    }

    let mut chosen = None;
    for factor in all_divisors(shape.c1 / n_dim).into_iter().filter(|&f| f > 1 && m_dim % f == 0) {
        chosen = Some(factor);
        if ceil_div(plane, m_dim / factor) > block {
            break;
        }
    }

    match chosen {
        Some(factor) => (n_dim * factor, m_dim / factor),
        None => (n_dim, m_dim),
    }
}

fn finalize(shape: &ProblemShape, m1: usize, batch_dim: usize, n_dim: usize, m_dim: usize) -> Result<BlockDims> {
    ensure!(batch_dim > 0, ZeroDenominatorSnafu { stage: "block_dim", what: "batch_dim" });
    ensure!(n_dim > 0, ZeroDenominatorSnafu { stage: "block_dim", what: "n_dim" });
    ensure!(m_dim > 0, ZeroDenominatorSnafu { stage: "block_dim", what: "m_dim" });

    let dims = BlockDims {
        batch_dim,
        n_dim,
        m_dim,
        batch_single: shape.batch / batch_dim,
        m_single: ceil_div(m1, m_dim),
        n_single: shape.c1 / n_dim,
        k_single: shape.k2(),
    };
    tracing::debug!(
        batch_dim = dims.batch_dim,
        n_dim = dims.n_dim,
        m_dim = dims.m_dim,
        m_single = dims.m_single,
        n_single = dims.n_single,
        "block dims selected"
    );
    Ok(dims)
}
