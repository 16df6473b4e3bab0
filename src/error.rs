//! Error types shared by the library.
//!
//! Configuration errors are fatal and reported before any work starts.
//! Task errors are local to a single generation task: the executor tallies
//! them and keeps going.

use thiserror::Error;

/// Problems with the run configuration. Nothing is generated or written when
/// one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid date {input:?}: expected DD.MM.YYYY")]
    InvalidDate { input: String },

    #[error("date {input:?} has no local midnight")]
    NoLocalMidnight { input: String },

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid password limit {0:?}: expected a positive integer or \"unbounded\"")]
    InvalidLimit(String),

    #[error("at least one algorithm is required")]
    NoAlgorithms,

    #[error("at least one password length is required")]
    NoLengths,

    #[error("password lengths must be positive")]
    ZeroLength,

    #[error("timezone offset {0} is not a finite number of hours")]
    InvalidTimezoneOffset(f64),

    #[error("num_passwords must be positive when bounded")]
    ZeroPasswords,

    #[error("{field} must be positive")]
    ZeroParameter { field: &'static str },

    #[error("task space of {tasks} tasks exceeds the limit of {limit}")]
    TaskSpaceTooLarge { tasks: u128, limit: u128 },
}

/// Failure of a single generation task.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("seed {0} does not fit in an unsigned 32-bit integer")]
    SeedOutOfRange(i64),
}

/// Failure to run a task space at all.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
