//! Per-level factor selectors.
//!
//! Run in this order, each consuming only the results of the earlier ones:
//! 1. [`block_dim`]: split batch, N and M across cores
//! 2. [`l0`]: matmul tile with the UB double-buffer retry ladder
//! 3. [`l1`]: K/M/N multipliers staged in L1, derives `hosh`
//! 4. [`ub`]: stride-expansion and copy-out tiles

pub mod block_dim;
pub mod l0;
pub mod l1;
pub mod ub;

pub use block_dim::{BlockDims, select_block_dims};
pub use l0::{L0Factors, select_l0_factors};
pub use l1::{L1Factors, select_l1_factors};
pub use ub::{UbFactors, select_ub_factors};
