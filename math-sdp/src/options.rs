//! Solver options and backend selection.

use crate::barrier::LogBarrier;
use crate::error::{Result, SdpError};
use crate::traits::SdpSolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available SDP backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// In-process primal log-barrier interior-point method
    #[default]
    LogBarrier,
    /// Clarabel interior-point conic solver (`clarabel` feature)
    Clarabel,
}

impl Backend {
    /// Every backend known to this crate, compiled in or not.
    pub const ALL: [Backend; 2] = [Backend::LogBarrier, Backend::Clarabel];

    /// `true` when the backend is compiled into this build.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::LogBarrier => true,
            Backend::Clarabel => cfg!(feature = "clarabel"),
        }
    }

    /// The solver implementing this backend.
    pub fn solver(&self) -> Result<Box<dyn SdpSolver>> {
        match self {
            Backend::LogBarrier => Ok(Box::new(LogBarrier)),
            #[cfg(feature = "clarabel")]
            Backend::Clarabel => Ok(Box::new(crate::conic::Clarabel)),
            #[cfg(not(feature = "clarabel"))]
            Backend::Clarabel => Err(SdpError::BackendUnavailable {
                name: self.to_string(),
                feature: "clarabel",
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::LogBarrier => f.write_str("log-barrier"),
            Backend::Clarabel => f.write_str("clarabel"),
        }
    }
}

impl FromStr for Backend {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "log-barrier" | "logbarrier" | "barrier" | "default" => Ok(Backend::LogBarrier),
            "clarabel" => Ok(Backend::Clarabel),
            _ => Err(SdpError::UnknownBackend {
                name: s.to_string(),
            }),
        }
    }
}

/// Options forwarded to the SDP backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdpOptions {
    /// Backend used by [`crate::Problem::solve`]
    pub backend: Backend,
    /// Log one line per barrier iteration at `info` level
    pub show_progress: bool,
    /// Maximum number of barrier (outer) iterations
    pub max_iterations: usize,
    /// Absolute tolerance on the duality gap
    pub abstol: f64,
    /// Relative tolerance on the duality gap
    pub reltol: f64,
    /// Tolerance on constraint satisfaction
    pub feastol: f64,
}

impl Default for SdpOptions {
    fn default() -> Self {
        Self {
            backend: Backend::LogBarrier,
            show_progress: false,
            max_iterations: 100,
            abstol: 1e-7,
            reltol: 1e-6,
            feastol: 1e-6,
        }
    }
}

impl SdpOptions {
    /// Check that every tolerance is positive and the iteration cap non-zero.
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            ("abstol", self.abstol),
            ("reltol", self.reltol),
            ("feastol", self.feastol),
        ];
        for (name, value) in tolerances {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SdpError::InvalidArgument {
                    reason: format!("{name} must be positive and finite, got {value}"),
                });
            }
        }
        if self.max_iterations == 0 {
            return Err(SdpError::InvalidArgument {
                reason: "max_iterations must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Same options with progress reporting switched on or off.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}
