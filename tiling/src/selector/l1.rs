//! L1 staging factors.
//!
//! L1 holds `k_al1` channel blocks of expanded `dy` rows for the A operand and
//! `k_bl1 × n_bl1` filter tiles for the B operand. Both K multipliers are searched over the
//! divisors of `co1`, N over the divisors of the L0 tile count, and M is pushed as high as the
//! remaining capacity allows when A carries the full K extent.

use itertools::iproduct;
use snafu::{OptionExt, ensure};

use super::{BlockDims, L0Factors};
use crate::context::TilingContext;
use crate::error::{CapacityExceededSnafu, NoL1FactorsSnafu, Result, ZeroDenominatorSnafu};
use crate::math::{all_divisors, ceil_div, nearest_factors};

/// `(db_al1, db_bl1)` settings tried for the initial buffering decision.
const DB_ORDER: [(usize, usize); 3] = [(2, 2), (1, 2), (1, 1)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct L1Factors {
    pub k_al1: usize,
    pub k_bl1: usize,
    pub m_al1: usize,
    pub n_bl1: usize,
    pub db_al1: usize,
    pub db_bl1: usize,
    /// Expanded `dy` rows resident per A refill.
    pub hosh: usize,
}

/// Choose L1 multipliers for a fixed L0 tile.
///
/// # Errors
///
/// - [`CapacityExceeded`](crate::TilingError::CapacityExceeded) when even the smallest stage
///   overflows L1 single buffered
/// - [`NoL1Factors`](crate::TilingError::NoL1Factors) when no divisor combination is valid
pub fn select_l1_factors(ctx: &TilingContext<'_>, dims: &BlockDims, l0: &L0Factors) -> Result<L1Factors> {
    ensure!(l0.m_l0 > 0 && l0.n_l0 > 0 && l0.k_l0 > 0, ZeroDenominatorSnafu { stage: "l1", what: "L0 tile" });

    let shape = ctx.shape;
    let capacity = ctx.hardware.l1_bytes;
    let (db_al1, db_bl1) = initial_buffering(ctx, dims, l0)?;

    let k_divisors = all_divisors(shape.co1);
    let n_divisors = all_divisors(ceil_div(dims.n_single, l0.n_l0));
    let epsilon = ctx.tuning.cost_epsilon;
    let mut best: Option<(L1Factors, f64)> = None;

    for (k_bl1, k_al1, n_bl1) in
        iproduct!(k_divisors.iter().copied(), k_divisors.iter().copied(), n_divisors.iter().copied())
    {
        if n_bl1 > 1 && k_bl1 < shape.co1 {
            continue;
        }
        if !k_compatible(ctx, l0, k_al1, k_bl1) {
            continue;
        }

        let b_bytes = ctx.l1_b_bytes(k_bl1, n_bl1 * l0.n_l0, db_bl1);
        let Some((m_al1, hosh)) = pick_m_al1(ctx, dims, l0, k_al1, db_al1, b_bytes) else {
            continue;
        };

        let factors = L1Factors { k_al1, k_bl1, m_al1, n_bl1, db_al1, db_bl1, hosh };
        let load = load_proxy(ctx, dims, l0, &factors);
        tracing::trace!(k_al1, k_bl1, m_al1, n_bl1, hosh, load, "L1 candidate");

        let accept = match best {
            None => true,
            Some((current, current_load)) => {
                let noise = epsilon * current_load.max(1.0);
                if load < current_load - noise {
                    true
                } else if (load - current_load).abs() <= noise {
                    (k_al1, k_bl1) > (current.k_al1, current.k_bl1)
                } else {
                    false
                }
            }
        };
        if accept {
            best = Some((factors, load));
        }
    }

    let (factors, load) = best.context(NoL1FactorsSnafu { capacity })?;
    tracing::debug!(
        k_al1 = factors.k_al1,
        k_bl1 = factors.k_bl1,
        m_al1 = factors.m_al1,
        n_bl1 = factors.n_bl1,
        hosh = factors.hosh,
        load,
        "L1 factors selected"
    );
    Ok(factors)
}

/// Drop A then B double buffering until the smallest stage fits.
fn initial_buffering(ctx: &TilingContext<'_>, dims: &BlockDims, l0: &L0Factors) -> Result<(usize, usize)> {
    let shape = ctx.shape;
    let k = nearest_factors(ceil_div(l0.k_l0, shape.khkw()), shape.co1)?.1;
    let hosh = ctx.hosh(dims.m_single, k, 1, l0.m_l0);
    let footprint = |(db_al1, db_bl1): (usize, usize)| {
        ctx.l1_a_bytes(k, hosh, db_al1) + ctx.l1_b_bytes(k, l0.n_l0, db_bl1)
    };

    let capacity = ctx.hardware.l1_bytes;
    match DB_ORDER.into_iter().find(|&db| footprint(db) <= capacity) {
        Some(db) => Ok(db),
        None => CapacityExceededSnafu { buffer: "L1", required: footprint((1, 1)), capacity }.fail(),
    }
}

/// Both K multipliers nest and line up with the L0 K tile.
fn k_compatible(ctx: &TilingContext<'_>, l0: &L0Factors, k_al1: usize, k_bl1: usize) -> bool {
    let khkw = ctx.shape.khkw();
    let (hi, lo) = (k_al1.max(k_bl1), k_al1.min(k_bl1));
    hi % lo == 0 && (k_al1 * khkw) % l0.k_l0 == 0 && (k_bl1 * khkw) % l0.k_l0 == 0
}

/// Largest M multiplier whose A stage fits next to `b_bytes`, with its `hosh`.
fn pick_m_al1(
    ctx: &TilingContext<'_>,
    dims: &BlockDims,
    l0: &L0Factors,
    k_al1: usize,
    db_al1: usize,
    b_bytes: usize,
) -> Option<(usize, usize)> {
    let capacity = ctx.hardware.l1_bytes;
    if b_bytes >= capacity {
        return None;
    }
    let fits = |m_al1: usize| {
        let hosh = ctx.hosh(dims.m_single, k_al1, m_al1, l0.m_l0);
        (hosh > 0 && ctx.l1_a_bytes(k_al1, hosh, db_al1) + b_bytes <= capacity).then_some((m_al1, hosh))
    };

    if k_al1 < ctx.shape.co1 {
        return fits(1);
    }

    let m_max = ceil_div(dims.m_single, l0.m_l0).max(1);
    if let Some(found) = fits(m_max) {
        return Some(found);
    }

    // Rows the leftover space holds bound how far M can reach.
    let row_bytes = ctx.row_bytes(k_al1) * db_al1;
    let rows = (capacity - b_bytes) / row_bytes.max(1);
    let reach = (rows + 1) * ctx.shape.w / (l0.m_l0 * ctx.block()) + 1;
    (1..m_max.min(reach + 1)).rev().find_map(fits)
}

/// Bytes moved into L1 over one core's whole run.
fn load_proxy(ctx: &TilingContext<'_>, dims: &BlockDims, l0: &L0Factors, f: &L1Factors) -> f64 {
    let shape = ctx.shape;
    let block = ctx.block();
    let m_tile = f.m_al1 * l0.m_l0;
    let n_tile = f.n_bl1 * l0.n_l0;
    let m_iters = ceil_div(dims.m_single, m_tile);
    let n_iters = ceil_div(dims.n_single, n_tile);

    let a_pass = (m_iters * f.hosh * shape.wi() * shape.co1 * block) as f64;
    let b_pass = (dims.n_single * block * dims.k_single * block) as f64;

    let a_resident = f.k_al1 == shape.co1 && m_tile >= dims.m_single;
    let b_resident = f.k_bl1 == shape.co1 && n_tile >= dims.n_single;

    let a_load = if a_resident { a_pass } else { a_pass * n_iters as f64 };
    let b_load = if b_resident { b_pass } else { b_pass * m_iters as f64 };
    a_load + b_load
}
