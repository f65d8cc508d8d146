//! Problem shape of a transposed convolution seen as a matmul.
//!
//! The incoming gradient `dy` of shape `(batch, co, ho, wo)` is the A operand, the filter is
//! the B operand and the produced `dx` of shape `(batch, c, h, w)` is the result:
//!
//! ```text
//! M = h * w            (flattened dx spatial, in rows of block_size elements)
//! N = c1               (dx channel blocks)
//! K = co1 * kh * kw    (dy channel blocks times the kernel window)
//! ```

use bon::bon;
use snafu::ensure;

use crate::config::{BLOCK_SIZE, HardwareSpec};
use crate::error::{InvalidShapeSnafu, Result};
use crate::math::ceil_div;

/// Validated problem description handed to [`gen_tiling`](crate::gen_tiling).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProblemShape {
    pub batch: usize,
    /// Channels of `dy`.
    pub co: usize,
    /// `co` in blocks.
    pub co1: usize,
    pub ho: usize,
    pub wo: usize,
    /// Channels of `dx`.
    pub c: usize,
    /// `c` in blocks.
    pub c1: usize,
    pub h: usize,
    pub w: usize,
    pub kh: usize,
    pub kw: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub dilation_h: usize,
    pub dilation_w: usize,
    pub pad_up: usize,
    pub pad_down: usize,
    pub pad_left: usize,
    pub pad_right: usize,
    /// Whether `dy` goes through the UB stride-expansion branch before L1.
    pub stride_expand: bool,
}

#[bon]
impl ProblemShape {
    /// Build a shape, deriving the channel block counts for the reference block size.
    ///
    /// `stride_expand` defaults to "any stride above one".
    #[builder]
    pub fn new(
        #[builder(default = 1)] batch: usize,
        co: usize,
        ho: usize,
        wo: usize,
        c: usize,
        h: usize,
        w: usize,
        kh: usize,
        kw: usize,
        #[builder(default = 1)] stride_h: usize,
        #[builder(default = 1)] stride_w: usize,
        #[builder(default = 1)] dilation_h: usize,
        #[builder(default = 1)] dilation_w: usize,
        #[builder(default)] pad_up: usize,
        #[builder(default)] pad_down: usize,
        #[builder(default)] pad_left: usize,
        #[builder(default)] pad_right: usize,
        stride_expand: Option<bool>,
    ) -> Self {
        Self {
            batch,
            co,
            co1: ceil_div(co, BLOCK_SIZE),
            ho,
            wo,
            c,
            c1: ceil_div(c, BLOCK_SIZE),
            h,
            w,
            kh,
            kw,
            stride_h,
            stride_w,
            dilation_h,
            dilation_w,
            pad_up,
            pad_down,
            pad_left,
            pad_right,
            stride_expand: stride_expand.unwrap_or(stride_h > 1 || stride_w > 1),
        }
    }
}

impl ProblemShape {
    pub const fn kh_dilation(&self) -> usize {
        (self.kh - 1) * self.dilation_h + 1
    }

    pub const fn kw_dilation(&self) -> usize {
        (self.kw - 1) * self.dilation_w + 1
    }

    pub const fn khkw(&self) -> usize {
        self.kh * self.kw
    }

    /// Rows of `block` elements covering the flattened `dx` plane.
    pub const fn m1(&self, block: usize) -> usize {
        ceil_div(self.h * self.w, block)
    }

    /// Contraction length in blocks.
    pub const fn k2(&self) -> usize {
        self.co1 * self.kh * self.kw
    }

    /// Width of one stride-expanded `dy` row.
    pub const fn wi(&self) -> usize {
        self.wo * self.stride_w
    }

    pub const fn is_unit_stride(&self) -> bool {
        self.stride_h == 1 && self.stride_w == 1 && self.dilation_h == 1 && self.dilation_w == 1
    }

    /// Check every field the selectors divide by, and the channel block counts.
    pub fn validate(&self, hardware: &HardwareSpec) -> Result<()> {
        let positive = [
            ("batch", self.batch),
            ("co", self.co),
            ("ho", self.ho),
            ("wo", self.wo),
            ("c", self.c),
            ("h", self.h),
            ("w", self.w),
            ("kh", self.kh),
            ("kw", self.kw),
            ("stride_h", self.stride_h),
            ("stride_w", self.stride_w),
            ("dilation_h", self.dilation_h),
            ("dilation_w", self.dilation_w),
        ];
        for (field, value) in positive {
            ensure!(value > 0, InvalidShapeSnafu { field, reason: "must be positive" });
        }

        let block = hardware.block_size;
        ensure!(self.co1 == ceil_div(self.co, block), InvalidShapeSnafu { field: "co1", reason: "must be ceil(co / block)" });
        ensure!(self.c1 == ceil_div(self.c, block), InvalidShapeSnafu { field: "c1", reason: "must be ceil(c / block)" });
        Ok(())
    }
}
