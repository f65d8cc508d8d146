//! Inputs shared by every selector of one tiling run.

use crate::config::{HardwareSpec, TuningConfig};
use crate::shape::ProblemShape;

/// Borrowed view of the problem, the target and the tuning knobs.
///
/// Built once per [`gen_tiling`](crate::gen_tiling) call; carries no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct TilingContext<'a> {
    pub shape: &'a ProblemShape,
    pub hardware: &'a HardwareSpec,
    pub tuning: &'a TuningConfig,
}

impl<'a> TilingContext<'a> {
    pub const fn new(shape: &'a ProblemShape, hardware: &'a HardwareSpec, tuning: &'a TuningConfig) -> Self {
        Self { shape, hardware, tuning }
    }

    pub const fn block(&self) -> usize {
        self.hardware.block_size
    }
}
