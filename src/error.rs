use thiserror::Error;

/// Errors returned by canopy formation and its distance measures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// A sparse vector slot was addressed outside the vector's cardinality.
    #[error("index {index} out of bounds for vector of size {size}")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Cardinality of the vector.
        size: usize,
    },

    /// A distance measure tag that names no known implementation.
    #[error("unknown distance measure: {0}")]
    UnknownMeasure(String),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
