//! End-to-end `gen_tiling` tests.

use test_case::test_case;

use crate::capacity::BufferUsage;
use crate::config::{HardwareSpec, TuningConfig};
use crate::context::TilingContext;
use crate::error::TilingError;
use crate::generate::{gen_tiling, gen_tiling_with_config};
use crate::plan::TilingPlan;
use crate::shape::ProblemShape;
use crate::test::helpers::{assert_plan_invariants, narrow_input_shape, resnet_shape};

#[test]
fn test_resnet_layer_plan() {
    let shape = resnet_shape();
    let hardware = HardwareSpec::default();
    let plan = gen_tiling(&shape, &hardware).unwrap();

    assert_eq!((plan.batch_dim, plan.n_dim, plan.m_dim), (1, 1, 32));
    assert_eq!((plan.m_single, plan.n_single, plan.k_single), (7, 4, 36));
    assert_eq!((plan.m_l0, plan.n_l0, plan.k_l0, plan.db_l0c), (7, 4, 9, 2));
    assert_eq!((plan.k_al1, plan.k_bl1, plan.m_al1, plan.n_bl1), (2, 4, 1, 0));
    assert_eq!((plan.db_al1, plan.db_bl1, plan.hosh), (2, 2, 4));
    assert_eq!((plan.m_aub, plan.k_aub, plan.n_cub, plan.db_aub, plan.db_cub), (1, 2, 4, 2, 2));
    assert_eq!(plan.tiling_id, "22202010");

    let tuning = TuningConfig::default();
    let usage = BufferUsage::of(&TilingContext::new(&shape, &hardware, &tuning), &plan);
    assert_eq!(usage.l0a, 64512);
    assert_eq!(usage.l1, 176128);
    assert_eq!(usage.ub, 50176);
}

#[test]
fn test_single_core_covers_input_row() {
    let shape = resnet_shape();
    let hardware = HardwareSpec::builder().core_num(1).build();
    let plan = gen_tiling(&shape, &hardware).unwrap();

    assert_eq!((plan.batch_dim, plan.n_dim, plan.m_dim), (1, 1, 1));
    assert!(plan.m_single * 16 >= shape.w);
    assert_plan_invariants(&shape, &hardware, &plan);
}

#[test]
fn test_ub_pressure_lowers_double_buffering() {
    let shape = resnet_shape();
    let hardware = HardwareSpec::builder().ub_bytes(16 * 1024).build();
    let plan = gen_tiling(&shape, &hardware).unwrap();
    assert_eq!((plan.db_aub, plan.db_cub), (1, 2));
    assert_eq!((plan.m_aub, plan.k_aub, plan.n_cub), (1, 1, 1));
    assert_plan_invariants(&shape, &hardware, &plan);
}

#[test_case(HardwareSpec::default() ; "reference chip")]
#[test_case(HardwareSpec::lite() ; "lite part")]
#[test_case(HardwareSpec::builder().l0c_bytes(32 * 1024).build() ; "small accumulator")]
fn test_plans_satisfy_invariants(hardware: HardwareSpec) {
    let shapes = [
        resnet_shape(),
        narrow_input_shape(),
        ProblemShape { batch: 4, ..resnet_shape() },
        ProblemShape::builder()
            .batch(2)
            .co(32)
            .ho(14)
            .wo(14)
            .c(48)
            .h(28)
            .w(28)
            .kh(3)
            .kw(3)
            .stride_h(2)
            .stride_w(2)
            .pad_up(1)
            .pad_left(1)
            .build(),
    ];
    for shape in shapes {
        let plan = gen_tiling(&shape, &hardware).unwrap();
        assert_plan_invariants(&shape, &hardware, &plan);
    }
}

#[test]
fn test_strided_shape_sets_expand_digit() {
    let shape = ProblemShape::builder()
        .co(32)
        .ho(14)
        .wo(14)
        .c(32)
        .h(28)
        .w(28)
        .kh(3)
        .kw(3)
        .stride_h(2)
        .stride_w(2)
        .pad_up(1)
        .pad_left(1)
        .build();
    let plan = gen_tiling(&shape, &HardwareSpec::default()).unwrap();
    assert!(plan.tiling_id.ends_with('1'));
    assert_eq!(plan.tiling_id.len(), 8);
}

#[test]
fn test_invalid_shape() {
    let shape = ProblemShape { h: 0, ..resnet_shape() };
    assert_eq!(
        gen_tiling(&shape, &HardwareSpec::default()),
        Err(TilingError::InvalidShape { field: "h", reason: "must be positive" })
    );
}

#[test]
fn test_invalid_hardware() {
    let hardware = HardwareSpec::builder().core_num(0).build();
    assert_eq!(gen_tiling(&resnet_shape(), &hardware), Err(TilingError::InvalidHardware { field: "core_num" }));
}

#[test]
fn test_ub_too_small() {
    let hardware = HardwareSpec::builder().ub_bytes(4096).build();
    let result = gen_tiling(&resnet_shape(), &hardware);
    assert!(matches!(result, Err(TilingError::CapacityExceeded { buffer: "UB", .. })), "unexpected {result:?}");
}

#[test]
fn test_l1_too_small() {
    let hardware = HardwareSpec::builder().l1_bytes(1024).build();
    let result = gen_tiling(&resnet_shape(), &hardware);
    assert!(matches!(result, Err(TilingError::CapacityExceeded { buffer: "L1", .. })), "unexpected {result:?}");
}

#[test]
fn test_tuning_changes_split() {
    let shape = resnet_shape();
    let hardware = HardwareSpec::default();
    let tuning = TuningConfig::builder().min_core_workload(2000).build();
    let plan = gen_tiling_with_config(&shape, &hardware, &tuning).unwrap();
    assert_eq!(plan.m_dim, 15);
    assert_eq!(plan.m_single, 14);
}

#[test]
fn test_deterministic() {
    let shape = resnet_shape();
    let hardware = HardwareSpec::default();
    let first = gen_tiling(&shape, &hardware).unwrap();
    for _ in 0..4 {
        assert_eq!(gen_tiling(&shape, &hardware).unwrap(), first);
    }
}

#[test]
fn test_plan_types_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TilingPlan>();
    assert_send_sync::<ProblemShape>();
    assert_send_sync::<HardwareSpec>();
    assert_send_sync::<TilingError>();
}
