use snafu::Snafu;

pub type Result<T, E = TilingError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum TilingError {
    /// A shape field is zero or inconsistent with the block size.
    #[snafu(display("invalid problem shape: {field} {reason}"))]
    InvalidShape { field: &'static str, reason: &'static str },

    #[snafu(display("invalid hardware description: {field} must be positive"))]
    InvalidHardware { field: &'static str },

    /// A selector reached a division whose denominator must be positive.
    #[snafu(display("zero denominator in {stage}: {what}"))]
    ZeroDenominator { stage: &'static str, what: &'static str },

    #[snafu(display("nearest factor search needs positive inputs, got factor {factor} of {dim}"))]
    ZeroFactor { factor: usize, dim: usize },

    #[snafu(display("no block dimension split fits {core_num} cores"))]
    NoBlockDims { core_num: usize },

    #[snafu(display("{buffer} capacity exceeded: {required} > {capacity} bytes"))]
    CapacityExceeded { buffer: &'static str, required: usize, capacity: usize },

    #[snafu(display("no L1 factors fit into {capacity} bytes"))]
    NoL1Factors { capacity: usize },
}
