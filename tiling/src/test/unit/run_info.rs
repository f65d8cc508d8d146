//! Run info derivation tests.

use crate::capacity::BufferUsage;
use crate::config::{HardwareSpec, TuningConfig};
use crate::context::TilingContext;
use crate::generate::{gen_tiling, gen_tiling_with_config};
use crate::plan::TilingPlan;
use crate::run_info::RunInfo;
use crate::shape::ProblemShape;
use crate::test::helpers::resnet_shape;

#[test]
fn test_resnet_run_info() {
    let shape = resnet_shape();
    let hardware = HardwareSpec::default();
    let plan = gen_tiling(&shape, &hardware).unwrap();
    let info = RunInfo::new(&shape, &hardware, &TuningConfig::default(), &plan);

    assert_eq!(info.batch, 1);
    assert_eq!(info.co1, 4);
    assert_eq!(info.pad_up_before, 1);
    assert_eq!(info.pad_right_after, 1);
    assert_eq!(info.m_dim, 32);
    assert_eq!(info.n_bl1, 0);
    assert_eq!(info.hosh, 4);
    assert_eq!(info.l1_bytes, 176128);
    assert_eq!(info.ub_bytes, 50176);
    assert_eq!(info.tiling_id, 22202010);
}

#[test]
fn test_field_order_is_stable() {
    let plan = gen_tiling(&resnet_shape(), &HardwareSpec::default()).unwrap();
    let info = RunInfo::new(&resnet_shape(), &HardwareSpec::default(), &TuningConfig::default(), &plan);
    let fields = info.fields();

    let names: Vec<_> = fields.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, RunInfo::FIELD_NAMES);
    assert_eq!(fields.first(), Some(&("batch", 1)));
    assert_eq!(fields.last(), Some(&("tiling_id", 22202010)));
    assert_eq!(fields.len(), 40);
}

#[test]
fn test_negative_padding() {
    let shape = ProblemShape { pad_up: 4, pad_left: 3, ..resnet_shape() };
    let info = RunInfo::new(&shape, &HardwareSpec::default(), &TuningConfig::default(), &TilingPlan::default());
    assert_eq!(info.pad_up_before, -2);
    assert_eq!(info.pad_left_before, -1);
    assert_eq!(info.pad_down_after, 1);
}

#[test]
fn test_dilation_widens_padding() {
    let shape = ProblemShape { dilation_h: 2, ..resnet_shape() };
    let info = RunInfo::new(&shape, &HardwareSpec::default(), &TuningConfig::default(), &TilingPlan::default());
    // kh_dilation 5, pad 1
    assert_eq!(info.pad_up_before, 3);
    assert_eq!(info.pad_left_before, 1);
}

#[test]
fn test_empty_plan_has_zero_id() {
    let info = RunInfo::new(&resnet_shape(), &HardwareSpec::default(), &TuningConfig::default(), &TilingPlan::default());
    assert_eq!(info.tiling_id, 0);
    assert_eq!(info.l1_bytes, 0);
}

#[test]
fn test_custom_tuning_occupancy() {
    let shape = resnet_shape();
    let hardware = HardwareSpec::builder().ub_bytes(32 * 1024).build();
    let tuning = TuningConfig::builder().unit_stride_loadin_factor(1).build();
    let plan = gen_tiling_with_config(&shape, &hardware, &tuning).unwrap();

    let info = RunInfo::new(&shape, &hardware, &tuning, &plan);
    let usage = BufferUsage::of(&TilingContext::new(&shape, &hardware, &tuning), &plan);
    assert_eq!(info.ub_bytes, usage.ub as i64);
    assert!(info.ub_bytes <= hardware.ub_bytes as i64);
}
