//! L0 selector tests.

use test_case::test_case;

use crate::config::{HardwareSpec, TuningConfig};
use crate::selector::l0::{cut_points, try_l0_factors};
use crate::selector::{L0Factors, select_block_dims, select_l0_factors};
use crate::shape::ProblemShape;
use crate::test::helpers::{narrow_input_shape, resnet_shape, with_ctx};

fn l0_for(shape: &ProblemShape, hardware: &HardwareSpec) -> L0Factors {
    with_ctx(shape, hardware, &TuningConfig::default(), |ctx| {
        let dims = select_block_dims(ctx).unwrap();
        select_l0_factors(ctx, &dims)
    })
}

#[test]
fn test_cut_points() {
    assert_eq!(cut_points(7, 11).as_slice(), &[7, 6]);
    assert_eq!(cut_points(30, 11).as_slice(), &[11, 10, 15]);
    assert_eq!(cut_points(1, 11).as_slice(), &[1]);
}

#[test]
fn test_resnet_layer_tile() {
    let l0 = l0_for(&resnet_shape(), &HardwareSpec::default());
    assert_eq!(l0, L0Factors { m_l0: 7, n_l0: 4, k_l0: 9, db_l0c: 2, db_aub: 2, db_cub: 2 });
}

#[test]
fn test_k_tile_below_kernel_window() {
    // L0A only fits two K fractals next to a 28-row M tile, so K snaps to a divisor of 9.
    let l0 = l0_for(&narrow_input_shape(), &HardwareSpec::default());
    assert_eq!((l0.m_l0, l0.n_l0, l0.k_l0), (28, 4, 1));
}

#[test]
fn test_small_l0c_limits_tile() {
    let hardware = HardwareSpec::builder().l0c_bytes(32 * 1024).build();
    let l0 = l0_for(&narrow_input_shape(), &hardware);
    assert_eq!((l0.m_l0, l0.n_l0, l0.k_l0), (5, 3, 9));
    assert!(l0.m_l0 * l0.n_l0 <= hardware.l0c_fractals());
}

#[test]
fn test_ladder_drops_aub_double_buffer() {
    let hardware = HardwareSpec::builder().ub_bytes(16 * 1024).build();
    let shape = resnet_shape();
    with_ctx(&shape, &hardware, &TuningConfig::default(), |ctx| {
        let dims = select_block_dims(ctx).unwrap();
        assert!(try_l0_factors(ctx, &dims, 2, 2).is_none());

        let l0 = select_l0_factors(ctx, &dims);
        assert_eq!((l0.db_cub, l0.db_aub), (2, 1));
        assert_eq!(l0.m_l0, 7);
    });
}

#[test]
fn test_exhausted_ladder_falls_back() {
    let hardware = HardwareSpec::builder().ub_bytes(4096).build();
    let l0 = l0_for(&resnet_shape(), &hardware);
    assert_eq!(l0, L0Factors { m_l0: 1, n_l0: 1, k_l0: 1, db_l0c: 2, db_aub: 1, db_cub: 1 });
}

#[test_case(16, 1, 1 ; "single k block")]
#[test_case(48, 3, 3 ; "three k blocks 3x3")]
#[test_case(64, 5, 5 ; "four k blocks 5x5")]
#[test_case(128, 1, 7 ; "eight k blocks 1x7")]
fn test_k_tile_matches_l1_multiplier(co: usize, kh: usize, kw: usize) {
    let shape = ProblemShape::builder()
        .co(co)
        .ho(28)
        .wo(28)
        .c(64)
        .h(28)
        .w(28)
        .kh(kh)
        .kw(kw)
        .pad_up(kh / 2)
        .pad_down(kh / 2)
        .pad_left(kw / 2)
        .pad_right(kw / 2)
        .build();
    let l0 = l0_for(&shape, &HardwareSpec::default());
    let khkw = shape.khkw();

    // Either a whole number of windows dividing co1, or a divisor of one window.
    let compatible = if l0.k_l0 >= khkw {
        l0.k_l0 % khkw == 0 && shape.co1 % (l0.k_l0 / khkw) == 0
    } else {
        khkw % l0.k_l0 == 0
    };
    assert!(compatible, "k_l0 {} incompatible with co1 {} and window {}", l0.k_l0, shape.co1, khkw);
    assert!(l0.m_l0 * l0.n_l0 <= HardwareSpec::default().l0c_fractals());
}
