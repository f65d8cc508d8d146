//! Hardware and tuning configuration.
//!
//! [`HardwareSpec`] describes the target's buffer capacities and core count, [`TuningConfig`]
//! holds the empirically tuned constants of the cost model. Both come with bon builders and
//! defaults matching the reference chip.

use bon::Builder;
use snafu::ensure;

use crate::error::{InvalidHardwareSnafu, Result};

/// Fractal edge length: channels per block and rows per fractal.
pub const BLOCK_SIZE: usize = 16;

/// L0A/L0B are always double buffered.
pub const L0_AB_DB: usize = 2;

// ============================================================================
// HARDWARE
// ============================================================================

/// Buffer capacities and parallelism of the target accelerator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardwareSpec {
    /// Number of cube cores a kernel can be split across.
    #[builder(default = 32)]
    pub core_num: usize,
    #[builder(default = 64 * 1024)]
    pub l0a_bytes: usize,
    #[builder(default = 64 * 1024)]
    pub l0b_bytes: usize,
    /// Accumulator buffer, holds fp32 fractals.
    #[builder(default = 256 * 1024)]
    pub l0c_bytes: usize,
    #[builder(default = 1024 * 1024)]
    pub l1_bytes: usize,
    /// Staging buffer used for stride expansion and copy-out.
    #[builder(default = 256 * 1024)]
    pub ub_bytes: usize,
    #[builder(default = BLOCK_SIZE)]
    pub block_size: usize,
    #[builder(default = 2)]
    pub fp16_bytes: usize,
    #[builder(default = 4)]
    pub fp32_bytes: usize,
}

impl Default for HardwareSpec {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl HardwareSpec {
    /// Two-core inference part with halved buffers.
    pub fn lite() -> Self {
        Self::builder()
            .core_num(2)
            .l0a_bytes(32 * 1024)
            .l0b_bytes(32 * 1024)
            .l0c_bytes(128 * 1024)
            .l1_bytes(512 * 1024)
            .ub_bytes(192 * 1024)
            .build()
    }

    /// Override the core count with whatever the platform reports.
    ///
    /// The platform is queried once; a missing or zero answer keeps the configured value.
    pub fn with_platform(mut self, platform: &impl PlatformInfo) -> Self {
        if let Some(core_num) = platform.core_num()
            && core_num > 0
        {
            tracing::debug!(configured = self.core_num, reported = core_num, "platform core count override");
            self.core_num = core_num;
        }
        self
    }

    /// Bytes of one `block × block` fp16 fractal.
    pub const fn fractal_bytes(&self) -> usize {
        self.block_size * self.block_size * self.fp16_bytes
    }

    /// Bytes of one `block × block` fp32 accumulator fractal.
    pub const fn acc_fractal_bytes(&self) -> usize {
        self.block_size * self.block_size * self.fp32_bytes
    }

    /// Fractals one L0A buffer holds under double buffering.
    pub const fn l0a_fractals(&self) -> usize {
        self.l0a_bytes / self.fractal_bytes() / L0_AB_DB
    }

    pub const fn l0b_fractals(&self) -> usize {
        self.l0b_bytes / self.fractal_bytes() / L0_AB_DB
    }

    /// Upper bound on `m_l0 * n_l0` with a double-buffered accumulator.
    pub const fn l0c_fractals(&self) -> usize {
        self.l0c_bytes / self.acc_fractal_bytes() / 2
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("core_num", self.core_num),
            ("l0a_bytes", self.l0a_bytes),
            ("l0b_bytes", self.l0b_bytes),
            ("l0c_bytes", self.l0c_bytes),
            ("l1_bytes", self.l1_bytes),
            ("ub_bytes", self.ub_bytes),
            ("block_size", self.block_size),
            ("fp16_bytes", self.fp16_bytes),
            ("fp32_bytes", self.fp32_bytes),
        ];
        for (field, value) in fields {
            ensure!(value > 0, InvalidHardwareSnafu { field });
        }
        Ok(())
    }
}

/// Source of runtime platform facts.
///
/// Implemented by whatever layer knows the actual chip variant; the tiling search only ever
/// asks for the core count.
pub trait PlatformInfo {
    fn core_num(&self) -> Option<usize>;
}

// ============================================================================
// TUNING
// ============================================================================

/// Cost-model constants tuned for one chip generation.
#[derive(Debug, Clone, PartialEq, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TuningConfig {
    /// Seed edge for L0 candidates, `⌊sqrt(l0c_fractals)⌋` on the reference chip.
    #[builder(default = 11)]
    pub l0_optimal_node: usize,
    /// Minimum per-core compute units before the block selector stops splitting M.
    #[builder(default = 1000)]
    pub min_core_workload: usize,
    /// UB load-in amplification when neither stride nor dilation exceeds one.
    #[builder(default = 3)]
    pub unit_stride_loadin_factor: usize,
    /// Relative threshold under which two costs count as equal.
    #[builder(default = 1e-6)]
    pub cost_epsilon: f64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TuningConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `DXTILE_L0_OPTIMAL_NODE` - L0 candidate seed (default: 11)
    /// * `DXTILE_MIN_CORE_WORKLOAD` - per-core compute floor (default: 1000)
    /// * `DXTILE_UNIT_STRIDE_LOADIN_FACTOR` - UB load-in factor for unit stride (default: 3)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    ///
    /// Missing, unparsable and zero values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |name: &str, fallback: usize| {
            lookup(name).and_then(|s| s.parse().ok()).filter(|v| *v > 0).unwrap_or(fallback)
        };

        Self {
            l0_optimal_node: read("DXTILE_L0_OPTIMAL_NODE", defaults.l0_optimal_node),
            min_core_workload: read("DXTILE_MIN_CORE_WORKLOAD", defaults.min_core_workload),
            unit_stride_loadin_factor: read("DXTILE_UNIT_STRIDE_LOADIN_FACTOR", defaults.unit_stride_loadin_factor),
            ..defaults
        }
    }
}
