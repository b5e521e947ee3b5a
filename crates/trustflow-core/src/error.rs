//! Error types for trustflow-core.

use thiserror::Error;

/// Errors that can occur when parsing or encoding core primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid avatar identifier (bad hex, wrong length).
    #[error("invalid avatar id: {0}")]
    InvalidAvatarId(String),

    /// Invalid amount (overflow, negative, malformed).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Packed coordinate bytes do not match the declared edge count.
    #[error("packed coordinates are {actual} bytes, expected {expected} for {edges} edges")]
    CoordinateLength {
        /// Number of edges the coordinates should describe.
        edges: usize,
        /// Expected byte length (`6 * edges`).
        expected: usize,
        /// Actual byte length supplied.
        actual: usize,
    },

    /// Packed coordinate bytes are not a whole number of triples.
    #[error("packed coordinates are {0} bytes, not a multiple of 6")]
    TruncatedCoordinates(usize),
}

impl CoreError {
    /// Create an invalid avatar id error.
    #[must_use]
    pub fn invalid_avatar_id(message: impl Into<String>) -> Self {
        Self::InvalidAvatarId(message.into())
    }

    /// Create an invalid amount error.
    #[must_use]
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_length_display_names_both_sizes() {
        let err = CoreError::CoordinateLength {
            edges: 2,
            expected: 12,
            actual: 11,
        };
        let s = err.to_string();
        assert!(s.contains("11 bytes"));
        assert!(s.contains("expected 12"));
    }

    #[test]
    fn helper_constructors() {
        assert!(matches!(
            CoreError::invalid_avatar_id("x"),
            CoreError::InvalidAvatarId(_)
        ));
        assert!(matches!(
            CoreError::invalid_amount("y"),
            CoreError::InvalidAmount(_)
        ));
    }
}
