//! Tiling entry points.

use crate::capacity::BufferUsage;
use crate::config::{HardwareSpec, TuningConfig};
use crate::context::TilingContext;
use crate::encode::{apply_special_template, encode};
use crate::error::Result;
use crate::plan::TilingPlan;
use crate::selector::{select_block_dims, select_l0_factors, select_l1_factors, select_ub_factors};
use crate::shape::ProblemShape;

/// Compute a tiling plan with the default tuning constants.
///
/// See [`gen_tiling_with_config`].
pub fn gen_tiling(shape: &ProblemShape, hardware: &HardwareSpec) -> Result<TilingPlan> {
    gen_tiling_with_config(shape, hardware, &TuningConfig::default())
}

/// Compute a tiling plan.
///
/// Stages run in order, each reading only earlier results:
/// 1. block dims
/// 2. L0 tile (through the UB double-buffer ladder)
/// 3. L1 factors and `hosh`
/// 4. UB factors
/// 5. special template and tiling id
///
/// The finished plan is checked against every buffer capacity before it is returned; no
/// partial plan ever escapes.
///
/// # Errors
///
/// Shape or hardware validation failures, block-dim search failures, and L1/UB capacity
/// failures. L0 exhaustion is absorbed by a fallback tile.
#[tracing::instrument(skip_all, fields(
    batch = shape.batch,
    co = shape.co,
    c = shape.c,
    h = shape.h,
    w = shape.w,
    core_num = hardware.core_num
))]
pub fn gen_tiling_with_config(
    shape: &ProblemShape,
    hardware: &HardwareSpec,
    tuning: &TuningConfig,
) -> Result<TilingPlan> {
    hardware.validate()?;
    shape.validate(hardware)?;
    let ctx = TilingContext::new(shape, hardware, tuning);

    let dims = select_block_dims(&ctx)?;
    let l0 = select_l0_factors(&ctx, &dims);
    let l1 = select_l1_factors(&ctx, &dims, &l0)?;
    let ub = select_ub_factors(&ctx, &l0, &l1)?;

    let mut plan = TilingPlan::default();
    plan.set_block_dims(&dims);
    plan.set_l0(&l0);
    plan.set_l1(&l1);
    plan.set_ub(&ub);

    apply_special_template(&mut plan);
    let encoding = encode(shape, &plan);
    plan.set_encoding(encoding);

    let usage = BufferUsage::of(&ctx, &plan);
    usage.check(&ctx)?;

    tracing::debug!(
        tiling_id = %plan.tiling_id,
        used_cores = plan.used_cores(),
        l1_bytes = usage.l1,
        ub_bytes = usage.ub,
        "tiling generated"
    );
    Ok(plan)
}
