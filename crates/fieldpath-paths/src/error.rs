use std::fmt;

use fieldpath_core::Point;

/// Failures reported by the planners.
///
/// Obstacles are never an error by themselves; they only surface as
/// [`PathError::NoPathFound`] once no route around them exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// The target cannot be reached from `at`.
    NoPathFound { at: Point },
    /// The agent gave up after `steps` moves without arriving.
    StepLimit { steps: usize },
    /// A step was requested before a plan was made.
    NotPlanned,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPathFound { at } => write!(f, "no path to target from {at}"),
            Self::StepLimit { steps } => write!(f, "target not reached after {steps} steps"),
            Self::NotPlanned => write!(f, "no plan: call plan() before stepping"),
        }
    }
}

impl std::error::Error for PathError {}
