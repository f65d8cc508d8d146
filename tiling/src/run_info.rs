//! Scalar kernel arguments derived from a finished plan.
//!
//! The generated kernel receives a flat list of signed integers. Field order is part of that
//! contract and is fixed by the declaration order below.

use crate::capacity::BufferUsage;
use crate::config::{HardwareSpec, TuningConfig};
use crate::context::TilingContext;
use crate::plan::TilingPlan;
use crate::shape::ProblemShape;

macro_rules! run_info {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        /// Ordered kernel arguments.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct RunInfo {
            $($(#[$meta])* pub $name: i64,)*
        }

        impl RunInfo {
            /// Argument names in kernel order.
            pub const FIELD_NAMES: &'static [&'static str] = &[$(stringify!($name)),*];

            /// `(name, value)` pairs in kernel order.
            pub fn fields(&self) -> Vec<(&'static str, i64)> {
                vec![$((stringify!($name), self.$name)),*]
            }
        }
    };
}

run_info! {
    batch,
    co,
    co1,
    ho,
    wo,
    c,
    c1,
    h,
    w,
    kh,
    kw,
    stride_h,
    stride_w,
    dilation_h,
    dilation_w,
    /// Forward-conv padding on the expanded `dy`; negative when the backward pad exceeds the window.
    pad_up_before,
    pad_left_before,
    pad_down_after,
    pad_right_after,
    batch_dim,
    n_dim,
    m_dim,
    batch_single,
    m_single,
    n_single,
    k_single,
    m_l0,
    n_l0,
    k_l0,
    k_al1,
    k_bl1,
    m_al1,
    n_bl1,
    hosh,
    m_aub,
    k_aub,
    n_cub,
    l1_bytes,
    ub_bytes,
    tiling_id,
}

// Validated shapes and plans stay far below `i64::MAX`; saturation only guards hand-built inputs.
fn signed(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl RunInfo {
    /// Derive run info for a plan produced under `tuning`.
    ///
    /// The UB occupancy depends on the tuning constants, so pass the same config the plan was
    /// generated with.
    pub fn new(shape: &ProblemShape, hardware: &HardwareSpec, tuning: &TuningConfig, plan: &TilingPlan) -> Self {
        Self::from_context(&TilingContext::new(shape, hardware, tuning), plan)
    }

    pub fn from_context(ctx: &TilingContext<'_>, plan: &TilingPlan) -> Self {
        let shape = ctx.shape;
        let usage = BufferUsage::of(ctx, plan);
        let kh_dilation = signed(shape.kh_dilation());
        let kw_dilation = signed(shape.kw_dilation());

        Self {
            batch: signed(shape.batch),
            co: signed(shape.co),
            co1: signed(shape.co1),
            ho: signed(shape.ho),
            wo: signed(shape.wo),
            c: signed(shape.c),
            c1: signed(shape.c1),
            h: signed(shape.h),
            w: signed(shape.w),
            kh: signed(shape.kh),
            kw: signed(shape.kw),
            stride_h: signed(shape.stride_h),
            stride_w: signed(shape.stride_w),
            dilation_h: signed(shape.dilation_h),
            dilation_w: signed(shape.dilation_w),
            pad_up_before: kh_dilation - 1 - signed(shape.pad_up),
            pad_left_before: kw_dilation - 1 - signed(shape.pad_left),
            pad_down_after: kh_dilation - 1 - signed(shape.pad_down),
            pad_right_after: kw_dilation - 1 - signed(shape.pad_right),
            batch_dim: signed(plan.batch_dim),
            n_dim: signed(plan.n_dim),
            m_dim: signed(plan.m_dim),
            batch_single: signed(plan.batch_single),
            m_single: signed(plan.m_single),
            n_single: signed(plan.n_single),
            k_single: signed(plan.k_single),
            m_l0: signed(plan.m_l0),
            n_l0: signed(plan.n_l0),
            k_l0: signed(plan.k_l0),
            k_al1: signed(plan.k_al1),
            k_bl1: signed(plan.k_bl1),
            m_al1: signed(plan.m_al1),
            n_bl1: signed(plan.n_bl1),
            hosh: signed(plan.hosh),
            m_aub: signed(plan.m_aub),
            k_aub: signed(plan.k_aub),
            n_cub: signed(plan.n_cub),
            l1_bytes: signed(usage.l1),
            ub_bytes: signed(usage.ub),
            // Empty on a default plan.
            tiling_id: plan.tiling_id.parse().unwrap_or(0),
        }
    }
}
