//! UB staging tiles: stride-expansion load-in of `dy` and copy-out of `dx`.

use itertools::iproduct;
use snafu::OptionExt;

use super::{L0Factors, L1Factors};
use crate::context::TilingContext;
use crate::error::{CapacityExceededSnafu, Result};
use crate::math::all_divisors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UbFactors {
    /// Expanded `dy` rows per load-in.
    pub m_aub: usize,
    pub k_aub: usize,
    pub n_cub: usize,
    pub db_aub: usize,
    pub db_cub: usize,
}

/// Choose UB tiles, preferring larger K, then larger N, then more bytes per transfer.
///
/// Starts from the buffering the L0 ladder settled on and only drops it if the smallest tile
/// would not fit.
///
/// # Errors
///
/// [`CapacityExceeded`](crate::TilingError::CapacityExceeded) when a `1 × 1 × 1` tile without
/// double buffering still overflows UB.
pub fn select_ub_factors(ctx: &TilingContext<'_>, l0: &L0Factors, l1: &L1Factors) -> Result<UbFactors> {
    let capacity = ctx.hardware.ub_bytes;
    let (db_aub, db_cub) = buffering(ctx, l0)?;

    let k_divisors = all_divisors(l1.k_al1);
    let n_divisors = all_divisors(l0.n_l0);
    let mut best: Option<((usize, usize, usize), usize)> = None;

    for (k_aub, n_cub) in iproduct!(k_divisors.iter().copied(), n_divisors.iter().copied()) {
        let cub = ctx.cub_bytes(n_cub, l0.m_l0, db_cub);
        if cub >= capacity {
            continue;
        }
        let per_row = ctx.aub_bytes(k_aub, 1, db_aub);
        let mut m_aub = ((capacity - cub) / per_row.max(1)).min(l1.hosh);
        if m_aub == 0 {
            continue;
        }
        // Partial K load-ins are issued one row at a time.
        if k_aub < ctx.shape.co1 {
            m_aub = 1;
        }

        let dma = ctx.aub_bytes(k_aub, m_aub, 1) + ctx.cub_bytes(n_cub, l0.m_l0, 1);
        let key = (k_aub, n_cub, dma);
        tracing::trace!(k_aub, n_cub, m_aub, dma, "UB candidate");
        if best.is_none_or(|(best_key, _)| key > best_key) {
            best = Some((key, m_aub));
        }
    }

    let ((k_aub, n_cub, _), m_aub) = best.context(CapacityExceededSnafu {
        buffer: "UB",
        required: ctx.ub_bytes(1, 1, 1, l0.m_l0, (db_aub, db_cub)),
        capacity,
    })?;
    let factors = UbFactors { m_aub, k_aub, n_cub, db_aub, db_cub };
    tracing::debug!(
        m_aub = factors.m_aub,
        k_aub = factors.k_aub,
        n_cub = factors.n_cub,
        db_aub,
        db_cub,
        "UB factors selected"
    );
    Ok(factors)
}

fn buffering(ctx: &TilingContext<'_>, l0: &L0Factors) -> Result<(usize, usize)> {
    let capacity = ctx.hardware.ub_bytes;
    let minimal = |db: (usize, usize)| ctx.ub_bytes(1, 1, 1, l0.m_l0, db);

    let ladder = [(l0.db_aub, l0.db_cub), (1, l0.db_cub), (1, 1)];
    match ladder.into_iter().find(|&db| minimal(db) <= capacity) {
        Some(db) => Ok(db),
        None => CapacityExceededSnafu { buffer: "UB", required: minimal((1, 1)), capacity }.fail(),
    }
}
