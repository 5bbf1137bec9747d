//! Error types for SDP construction and solution.

use thiserror::Error;

/// Errors that can occur while building or solving a semidefinite program.
#[derive(Debug, Error)]
pub enum SdpError {
    /// An argument is malformed (empty matrix, negative tolerance, ...).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the problem
        reason: String,
    },

    /// Two operands do not have compatible shapes.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// The expected shape, formatted as `rows x cols`
        expected: String,
        /// The shape that was supplied
        found: String,
    },

    /// An expression refers to a variable that was not declared by the problem.
    #[error("unknown variable index {id}")]
    UnknownVariable {
        /// The offending scalar variable index
        id: usize,
    },

    /// The backend could not make progress (singular Newton system, NaN values).
    #[error("numerical failure: {reason}")]
    NumericalFailure {
        /// Description of the failure
        reason: String,
    },

    /// The requested backend name is not recognised.
    #[error("unknown SDP backend '{name}'")]
    UnknownBackend {
        /// The name that was requested
        name: String,
    },

    /// The requested backend was not compiled into this build.
    #[error("SDP backend '{name}' requires the '{feature}' feature")]
    BackendUnavailable {
        /// The backend name
        name: String,
        /// Cargo feature enabling it
        feature: &'static str,
    },
}

/// A specialized `Result` type for SDP operations.
pub type Result<T> = std::result::Result<T, SdpError>;

impl SdpError {
    /// Returns `true` if this error is caused by the caller's input.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            SdpError::InvalidArgument { .. }
                | SdpError::DimensionMismatch { .. }
                | SdpError::UnknownVariable { .. }
                | SdpError::UnknownBackend { .. }
                | SdpError::BackendUnavailable { .. }
        )
    }

    /// Returns `true` if this is a numerical failure of the backend.
    pub fn is_numerical_error(&self) -> bool {
        matches!(self, SdpError::NumericalFailure { .. })
    }

    pub(crate) fn mismatch(expected: (usize, usize), found: (usize, usize)) -> Self {
        SdpError::DimensionMismatch {
            expected: format!("{} x {}", expected.0, expected.1),
            found: format!("{} x {}", found.0, found.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdpError::UnknownBackend {
            name: "mosek".to_string(),
        };
        assert_eq!(err.to_string(), "unknown SDP backend 'mosek'");
    }

    #[test]
    fn test_mismatch_display() {
        let err = SdpError::mismatch((3, 3), (2, 3));
        assert_eq!(
            err.to_string(),
            "dimension mismatch: expected 3 x 3, found 2 x 3"
        );
        assert!(err.is_argument_error());
        assert!(!err.is_numerical_error());
    }
}
