//! Attach flag and tiling id tests.

use strum::IntoEnumIterator;
use test_case::test_case;

use crate::encode::{AbKl1Flag, AttachFlag, Residency, apply_special_template, encode};
use crate::plan::TilingPlan;
use crate::shape::ProblemShape;
use crate::test::helpers::resnet_shape;

/// Plan the resnet layer ends up with before the special template.
fn resnet_plan() -> TilingPlan {
    TilingPlan {
        batch_dim: 1,
        n_dim: 1,
        m_dim: 32,
        batch_single: 1,
        m_single: 7,
        n_single: 4,
        k_single: 36,
        m_l0: 7,
        n_l0: 4,
        k_l0: 9,
        db_l0c: 2,
        k_al1: 2,
        k_bl1: 4,
        m_al1: 1,
        n_bl1: 1,
        db_al1: 2,
        db_bl1: 2,
        hosh: 4,
        ..Default::default()
    }
}

#[test_case(Residency::Full, true, AttachFlag::Full ; "full residency full k")]
#[test_case(Residency::Single, true, AttachFlag::Outer ; "single tile full k")]
#[test_case(Residency::Multi, true, AttachFlag::Outer ; "multi tile full k")]
#[test_case(Residency::Full, false, AttachFlag::KLoop ; "full residency partial k")]
#[test_case(Residency::Single, false, AttachFlag::KLoop ; "single tile partial k")]
#[test_case(Residency::Multi, false, AttachFlag::KLoop ; "multi tile partial k")]
fn test_attach_table(residency: Residency, k_full: bool, expected: AttachFlag) {
    assert_eq!(AttachFlag::classify(residency, k_full), expected);
}

#[test]
fn test_attach_table_is_total() {
    for residency in Residency::iter() {
        for k_full in [true, false] {
            let flag = AttachFlag::classify(residency, k_full);
            assert!(AttachFlag::iter().any(|f| f == flag));
            assert!((flag as usize) <= 2);
        }
    }
}

#[test]
fn test_residency_of() {
    assert_eq!(Residency::of(0), Residency::Full);
    assert_eq!(Residency::of(1), Residency::Single);
    assert_eq!(Residency::of(5), Residency::Multi);
    assert_eq!(Residency::Multi.as_ref(), "Multi");
}

#[test]
fn test_special_template_n_only_when_m_split() {
    let mut plan = resnet_plan();
    apply_special_template(&mut plan);
    assert_eq!(plan.m_al1, 1, "m_dim > 1 keeps the M multiplier");
    assert_eq!(plan.n_bl1, 0);
}

#[test]
fn test_special_template_single_m_core() {
    let mut plan = TilingPlan { m_dim: 1, ..resnet_plan() };
    apply_special_template(&mut plan);
    assert_eq!((plan.m_al1, plan.n_bl1), (0, 0));

    let mut plan = TilingPlan { m_dim: 1, m_l0: 3, n_l0: 2, ..resnet_plan() };
    apply_special_template(&mut plan);
    assert_eq!((plan.m_al1, plan.n_bl1), (1, 1));
}

#[test]
fn test_resnet_tiling_id() {
    let shape = resnet_shape();
    let mut plan = resnet_plan();
    apply_special_template(&mut plan);
    let encoding = encode(&shape, &plan);

    assert_eq!(encoding.al1, AttachFlag::KLoop);
    assert_eq!(encoding.bl1, AttachFlag::Full);
    assert_eq!(encoding.abkl1, AbKl1Flag::Same);
    assert_eq!(encoding.min_kl1_cmp_kl0, 1);
    assert_eq!(encoding.tiling_id, "22202010");

    plan.set_encoding(encoding);
    assert_eq!((plan.al1_attach_flag, plan.bl1_attach_flag), (2, 0));
}

#[test]
fn test_stride_expand_last_digit() {
    let shape = ProblemShape { stride_expand: true, ..resnet_shape() };
    let mut plan = resnet_plan();
    apply_special_template(&mut plan);
    assert_eq!(encode(&shape, &plan).tiling_id, "22202011");
}

#[test_case(2, 1, AbKl1Flag::ALarger ; "a deeper")]
#[test_case(1, 2, AbKl1Flag::BLarger ; "b deeper")]
#[test_case(2, 2, AbKl1Flag::Same ; "same depth")]
fn test_abkl1_when_both_reload_in_k(k_al1: usize, k_bl1: usize, expected: AbKl1Flag) {
    let shape = resnet_shape();
    // Neither multiplier covers its single-core range, so no sentinel applies.
    let mut plan = TilingPlan { k_al1, k_bl1, n_single: 8, k_l0: 9, ..resnet_plan() };
    apply_special_template(&mut plan);
    let encoding = encode(&shape, &plan);
    assert_eq!((encoding.al1, encoding.bl1), (AttachFlag::KLoop, AttachFlag::KLoop));
    assert_eq!(encoding.abkl1, expected);
}

#[test]
fn test_abkl1_ignored_unless_both_reload_in_k() {
    let shape = resnet_shape();
    let mut plan = TilingPlan { k_al1: 2, k_bl1: 4, n_single: 8, ..resnet_plan() };
    apply_special_template(&mut plan);
    let encoding = encode(&shape, &plan);
    assert_eq!(encoding.bl1, AttachFlag::Outer);
    assert_eq!(encoding.abkl1, AbKl1Flag::Same);
}

#[test]
fn test_min_kl1_matches_l0() {
    let shape = resnet_shape();
    let mut plan = TilingPlan { k_al1: 1, k_bl1: 4, ..resnet_plan() };
    apply_special_template(&mut plan);
    assert_eq!(encode(&shape, &plan).min_kl1_cmp_kl0, 0);
}
