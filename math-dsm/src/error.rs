//! Error types for NTF synthesis and modulator simulation.

use math_audio_sdp::SdpError;
use thiserror::Error;

/// Errors that can occur while designing or simulating a delta-sigma modulator.
#[derive(Debug, Error)]
pub enum DsmError {
    /// An argument is malformed (order, OSR, band list, pole count, ...).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the problem
        reason: String,
    },

    /// The optimisation problem has no acceptable solution.
    #[error("synthesis infeasible: solver status '{status}'")]
    Infeasible {
        /// Status reported by the SDP backend
        status: String,
    },

    /// The weighting matrix is indefinite beyond tolerance.
    #[error("weighting matrix is not positive semidefinite (min eigenvalue {min_eigenvalue:e})")]
    NumericallySingular {
        /// Smallest eigenvalue after normalisation
        min_eigenvalue: f64,
    },

    /// The modulator state grew beyond the safety ceiling.
    #[error("simulation overflow at sample {sample}: |y| = {value:e} exceeds {limit:e}")]
    SimulationOverflow {
        /// Index of the offending sample
        sample: usize,
        /// Magnitude of the quantiser input
        value: f64,
        /// The configured ceiling
        limit: f64,
    },

    /// A transfer function is unstable or its response does not decay.
    #[error("unstable system: {reason}")]
    Unstable {
        /// Description of the problem
        reason: String,
    },

    /// Error raised by the SDP layer.
    #[error(transparent)]
    Sdp(#[from] SdpError),
}

/// A specialized `Result` type for delta-sigma operations.
pub type Result<T> = std::result::Result<T, DsmError>;

impl DsmError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        DsmError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the caller supplied a malformed argument.
    pub fn is_argument_error(&self) -> bool {
        match self {
            DsmError::InvalidArgument { .. } => true,
            DsmError::Sdp(e) => e.is_argument_error(),
            _ => false,
        }
    }

    /// Returns `true` if the design problem was infeasible.
    pub fn is_infeasible_error(&self) -> bool {
        matches!(self, DsmError::Infeasible { .. })
    }

    /// Returns `true` for simulation overflow.
    pub fn is_overflow_error(&self) -> bool {
        matches!(self, DsmError::SimulationOverflow { .. })
    }

    /// Returns `true` for numerical problems (indefinite weighting, unstable
    /// responses, solver breakdown).
    pub fn is_numerical_error(&self) -> bool {
        match self {
            DsmError::NumericallySingular { .. } | DsmError::Unstable { .. } => true,
            DsmError::Sdp(e) => e.is_numerical_error(),
            _ => false,
        }
    }
}
