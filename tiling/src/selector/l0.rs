//! L0 matmul tile selection.
//!
//! Candidates are seeded from a fixed node (about `sqrt(l0c_fractals)`) and a few "cut points"
//! that split the single-core extent into near-equal tiles. Each `(m0, n0)` pair gets the
//! largest K tile both L0A and L0B can hold, and the pair with the smallest operand reload
//! count wins:
//!
//! ```text
//! load = ceil((m_single - 1) / m0) * n_single + ceil((n_single - 1) / n0) * m_single
//! ```
//!
//! UB double buffering competes with the L0 tile for the copy-out buffer, so selection runs
//! through a ladder of `(db_cub, db_aub)` settings and keeps the first that yields a tile.

use smallvec::SmallVec;
use std::cmp::Ordering;

use super::BlockDims;
use crate::context::TilingContext;
use crate::math::{ceil_div, nearest_factors};

/// `(db_cub, db_aub)` settings tried in order.
pub const DB_LADDER: [(usize, usize); 3] = [(2, 2), (2, 1), (1, 1)];

/// L0 tile in fractals plus the UB buffering it was validated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct L0Factors {
    pub m_l0: usize,
    pub n_l0: usize,
    pub k_l0: usize,
    pub db_l0c: usize,
    pub db_aub: usize,
    pub db_cub: usize,
}

#[derive(Debug, Clone, Copy)]
struct Scored {
    m0: usize,
    n0: usize,
    k0: usize,
    load: usize,
}

impl Scored {
    /// Lower load, then larger tile volume, then the more elongated `(m0, k0)` aspect.
    fn cmp_preference(&self, other: &Self) -> Ordering {
        other
            .load
            .cmp(&self.load)
            .then_with(|| (self.m0 * self.n0 * self.k0).cmp(&(other.m0 * other.n0 * other.k0)))
            .then_with(|| {
                let (hi, lo) = (self.m0.max(self.k0), self.m0.min(self.k0));
                let (other_hi, other_lo) = (other.m0.max(other.k0), other.m0.min(other.k0));
                (hi * other_lo).cmp(&(other_hi * lo))
            })
    }
}

/// Run the double-buffer ladder and return the first feasible tile.
///
/// Never fails: when no setting yields a tile, falls back to a `1 × 1 × 1` tile with UB
/// double buffering off and lets the later capacity check decide.
pub fn select_l0_factors(ctx: &TilingContext<'_>, dims: &BlockDims) -> L0Factors {
    for (db_cub, db_aub) in DB_LADDER {
        if let Some(factors) = try_l0_factors(ctx, dims, db_aub, db_cub) {
            tracing::debug!(
                m_l0 = factors.m_l0,
                n_l0 = factors.n_l0,
                k_l0 = factors.k_l0,
                db_aub,
                db_cub,
                "L0 factors selected"
            );
            return factors;
        }
        tracing::trace!(db_aub, db_cub, "no L0 tile under this UB buffering");
    }

    tracing::warn!(m_single = dims.m_single, n_single = dims.n_single, "L0 search exhausted, using 1x1x1 tile");
    L0Factors { m_l0: 1, n_l0: 1, k_l0: 1, db_l0c: l0c_buffering(ctx, 1, 1), db_aub: 1, db_cub: 1 }
}

/// Best L0 tile for one UB buffering setting, if any candidate fits.
pub fn try_l0_factors(ctx: &TilingContext<'_>, dims: &BlockDims, db_aub: usize, db_cub: usize) -> Option<L0Factors> {
    let node = ctx.tuning.l0_optimal_node;
    let mut best: Option<Scored> = None;

    for (m0, n0) in candidate_pairs(ctx, dims, node) {
        let Some(scored) = evaluate(ctx, dims, m0, n0, (db_aub, db_cub)) else {
            continue;
        };
        tracing::trace!(m0, n0, k0 = scored.k0, load = scored.load, "L0 candidate");
        if best.is_none_or(|b| scored.cmp_preference(&b) == Ordering::Greater) {
            best = Some(scored);
        }
    }

    best.map(|s| L0Factors {
        m_l0: s.m0,
        n_l0: s.n0,
        k_l0: s.k0,
        db_l0c: l0c_buffering(ctx, s.m0, s.n0),
        db_aub,
        db_cub,
    })
}

fn l0c_buffering(ctx: &TilingContext<'_>, m0: usize, n0: usize) -> usize {
    if ctx.l0c_bytes(m0, n0, 2) <= ctx.hardware.l0c_bytes { 2 } else { 1 }
}

/// Tile sizes splitting `single` into near-equal pieces around `node`.
pub(crate) fn cut_points(single: usize, node: usize) -> SmallVec<[usize; 3]> {
    let seed = node.min(single).max(1);
    let span = single.saturating_sub(1);
    let pieces = ceil_div(span, seed);

    let mut cuts: SmallVec<[usize; 3]> = SmallVec::new();
    cuts.push(seed);
    if pieces >= 1 {
        cuts.push(ceil_div(span, pieces));
    }
    if pieces > 1 {
        cuts.push(ceil_div(span, pieces - 1));
    }
    for cut in &mut cuts {
        *cut = (*cut).clamp(1, single.max(1));
    }
    cuts
}

fn candidate_pairs(ctx: &TilingContext<'_>, dims: &BlockDims, node: usize) -> SmallVec<[(usize, usize); 16]> {
    let l0c_fractals = ctx.hardware.l0c_fractals();
    let (m_single, n_single) = (dims.m_single, dims.n_single);
    let partner = |own: usize, other_single: usize| (l0c_fractals / own).min(other_single).max(1);

    let m_cuts = cut_points(m_single, node);
    let n_cuts = cut_points(n_single, node);

    let mut pairs: SmallVec<[(usize, usize); 16]> = SmallVec::new();
    let mut push = |pair: (usize, usize)| {
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    };

    for &m0 in &m_cuts {
        push((m0, partner(m0, n_single)));
    }
    for &n0 in &n_cuts {
        push((partner(n0, m_single), n0));
    }
    for &m0 in &m_cuts {
        for &n0 in &n_cuts {
            push((m0, n0));
        }
    }
    if m_single <= node {
        push((m_single.max(1), partner(m_single.max(1), n_single)));
    }
    if n_single <= node {
        push((partner(n_single.max(1), m_single), n_single.max(1)));
    }
    pairs
}

/// Largest kernel-window-compatible K tile for `(m0, n0)` and its reload count.
fn evaluate(ctx: &TilingContext<'_>, dims: &BlockDims, m0: usize, n0: usize, db: (usize, usize)) -> Option<Scored> {
    let hw = ctx.hardware;
    let shape = ctx.shape;
    let khkw = shape.khkw();

    let k_max = (hw.l0a_fractals() / m0).min(hw.l0b_fractals() / n0).min(dims.k_single);
    if k_max == 0 {
        return None;
    }
    let k0 = if k_max >= khkw {
        khkw * nearest_factors(k_max / khkw, shape.co1).ok()?.1
    } else {
        nearest_factors(k_max, khkw).ok()?.1
    };

    if m0 * n0 > hw.l0c_fractals()
        || ctx.l0a_bytes(m0, k0) > hw.l0a_bytes
        || ctx.l0b_bytes(n0, k0) > hw.l0b_bytes
        || ctx.l0c_bytes(m0, n0, 2) > hw.l0c_bytes
    {
        return None;
    }

    // Smallest L1 stage this tile could ever run with.
    let k_window = ceil_div(k0, khkw);
    let hosh = ctx.hosh(dims.m_single, k_window, 1, m0);
    if hosh == 0 || ctx.l1_a_bytes(k_window, hosh, 1) + ctx.l1_b_bytes(k_window, n0, 1) > hw.l1_bytes {
        return None;
    }

    if ctx.ub_bytes(1, 1, 1, m0, db) > hw.ub_bytes {
        return None;
    }

    let load = ceil_div(dims.m_single.saturating_sub(1), m0) * dims.n_single
        + ceil_div(dims.n_single.saturating_sub(1), n0) * dims.m_single;
    Some(Scored { m0, n0, k0, load })
}
