//! Integer helpers shared by every selector.
//!
//! All searches in this crate run over small, deterministic divisor sets, so these helpers
//! favour plain loops over anything clever.

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::{Result, ZeroFactorSnafu};

/// Ordered divisor list returned by [`all_divisors`].
pub type Divisors = SmallVec<[usize; 16]>;

/// `⌈a / b⌉`, with `0` for a zero divisor.
#[inline]
pub const fn ceil_div(a: usize, b: usize) -> usize {
    if b == 0 { 0 } else { a.div_ceil(b) }
}

/// Round `a` up to the next multiple of `b`.
#[inline]
pub const fn ceil_align(a: usize, b: usize) -> usize {
    ceil_div(a, b) * b
}

/// Find the divisors of `dim` surrounding a desired `factor`.
///
/// Returns `(ceil, floor)`:
/// - `ceil` is the first divisor found searching upward from `min(factor + 1, dim)`
/// - `floor` is the largest divisor not above `min(factor, dim)`
///
/// # Errors
///
/// [`ZeroFactor`](crate::TilingError::ZeroFactor) when `factor` or `dim` is zero, since either
/// would end up as a modulus.
pub fn nearest_factors(factor: usize, dim: usize) -> Result<(usize, usize)> {
    ensure!(factor > 0 && dim > 0, ZeroFactorSnafu { factor, dim });

    let mut ceil = (factor + 1).min(dim);
    while dim % ceil != 0 {
        ceil += 1;
    }

    let mut floor = factor.min(dim);
    while dim % floor != 0 {
        floor -= 1;
    }

    Ok((ceil, floor))
}

/// Divisors of `n` not above `n / 2` in ascending order, followed by `n` itself.
pub fn all_divisors(n: usize) -> Divisors {
    if n == 0 {
        return Divisors::new();
    }
    (1..=n / 2).filter(|d| n % d == 0).chain(std::iter::once(n)).collect()
}

/// Float comparison used for zero checks on ratio denominators.
#[inline]
pub fn float_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}
