//! The seam between the problem builder and its backends.

use crate::error::Result;
use crate::options::SdpOptions;
use crate::problem::{Problem, Solution};

/// A backend able to solve a [`Problem`].
///
/// Implementations receive the problem exactly as built (matrix inequalities
/// in `M ⪰ 0` form, scalar equalities, linear objective) and must return a
/// value for every scalar unknown together with a status. Infeasibility is a
/// status, not an error: errors are reserved for malformed input and
/// numerical breakdown.
pub trait SdpSolver: Send + Sync {
    /// Short backend name, used in log messages.
    fn name(&self) -> &'static str;

    /// Solve `problem` with the given tolerances.
    fn solve(&self, problem: &Problem, options: &SdpOptions) -> Result<Solution>;
}
