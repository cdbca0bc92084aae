use thiserror::Error;

/// Failure constructing a [`crate::Terminal`]. This is the only fallible
/// surface the engine exposes — once built, `write()` and the query surface
/// never fail (malformed input and out-of-range requests degrade silently,
/// see the crate-level docs).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("terminal dimensions must be non-zero (got {cols}x{rows})")]
    InvalidDimensions { cols: u16, rows: u16 },
    #[error("scrollback capacity must fit in a usize (negative capacities are rejected upstream of this type)")]
    InvalidScrollbackCapacity,
}
