//! Tiling-factor search for transposed-convolution cube kernels.
//!
//! Given a validated backward-data convolution shape and the target's buffer capacities, this
//! crate partitions the work across cores and across the L0/L1/UB buffer hierarchy, then
//! encodes the result as a decimal tiling id the kernel generator keys its templates on.
//!
//! # Module Organization
//!
//! - [`shape`] - Problem shape and its matmul view (`M = h*w`, `N = c1`, `K = co1*kh*kw`)
//! - [`config`] - Hardware capacities, platform seam and tuning constants
//! - [`capacity`] - Byte formulas shared by every selector and the final check
//! - [`selector`] - Block-dim, L0, L1 and UB searches
//! - [`encode`] - Attach flags and the tiling id
//! - [`generate`] - [`gen_tiling`] orchestrator
//! - [`run_info`] - Flat kernel arguments derived from a plan
//!
//! # Usage
//!
//! ```
//! use dxtile_tiling::{HardwareSpec, ProblemShape, gen_tiling};
//!
//! let shape = ProblemShape::builder()
//!     .co(64)
//!     .ho(56)
//!     .wo(56)
//!     .c(64)
//!     .h(56)
//!     .w(56)
//!     .kh(3)
//!     .kw(3)
//!     .pad_up(1)
//!     .pad_down(1)
//!     .pad_left(1)
//!     .pad_right(1)
//!     .build();
//! let plan = gen_tiling(&shape, &HardwareSpec::default()).unwrap();
//! assert_eq!(plan.tiling_id, "22202010");
//! ```
//!
//! Every function is a pure computation over its arguments; nothing is cached between calls.

pub mod capacity;
pub mod config;
pub mod context;
pub mod encode;
pub mod error;
pub mod generate;
pub mod math;
pub mod plan;
pub mod run_info;
pub mod selector;
pub mod shape;


pub use capacity::BufferUsage;
pub use config::{BLOCK_SIZE, HardwareSpec, PlatformInfo, TuningConfig};
pub use context::TilingContext;
pub use encode::{AbKl1Flag, AttachFlag, Encoding, Residency};
pub use error::{Result, TilingError};
pub use generate::{gen_tiling, gen_tiling_with_config};
pub use plan::TilingPlan;
pub use run_info::RunInfo;
pub use shape::ProblemShape;
