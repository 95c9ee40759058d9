//! Error types for vecdiff.

use thiserror::Error;

/// Errors raised while building a differentiable graph.
///
/// Every variant describes a caller contract violation detected at
/// construction time. Propagation never fails once a node exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiffError {
    /// Two operands that must have equal length do not.
    #[error("length mismatch: expected {expected} components, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A length that must be an exact multiple of another is not.
    #[error("length {len} is not divisible by {divisor}")]
    NotDivisible { len: usize, divisor: usize },

    /// Matrix dimensions are inconsistent with the data or with each other.
    #[error("matrix dimension mismatch: {rows}x{cols} against {other_rows}x{other_cols}")]
    MatrixDimension {
        rows: usize,
        cols: usize,
        other_rows: usize,
        other_cols: usize,
    },

    /// Slice range out of bounds.
    #[error("slice range {start}..{end} out of bounds for vector of length {len}")]
    SliceOutOfRange { start: usize, end: usize, len: usize },

    /// `pow_by` was handed an exponent that depends on variables.
    #[error("exponent must not depend on any variable")]
    NonConstantExponent,

    /// A reduce/expand asked to re-add or drop a sequence.
    #[error("presence violation at sequence {index}: {reason}")]
    PresenceViolation { index: usize, reason: &'static str },

    /// A sequence reappears after it terminated.
    #[error("sequence {index} reappears at timestep {timestep} after terminating")]
    NonMonotonicPresence { index: usize, timestep: usize },

    /// A presence mask has the wrong number of slots.
    #[error("presence mask has {actual} slots, expected {expected}")]
    PresenceLength { expected: usize, actual: usize },

    /// An aggregate was requested over sequences with no timesteps.
    #[error("{op}: sequences may not all be empty")]
    EmptySequence { op: &'static str },

    /// Sequences combined timestep-by-timestep do not line up.
    #[error("sequence shape mismatch at timestep {timestep}")]
    SeqShapeMismatch { timestep: usize },

    /// Mapper table entry points outside the input.
    #[error("mapper index {index} out of range for input of size {in_size}")]
    MapperIndex { index: usize, in_size: usize },

    /// Scalar representation other than 32- or 64-bit float.
    #[error("unsupported scalar representation: {0}")]
    UnsupportedScalar(String),
}
