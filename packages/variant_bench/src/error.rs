use std::time::Duration;

use thiserror::Error;

use crate::{LifecycleOperation, PerfMode};

/// Errors that stop a measurement. None of them is reported as a result.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum MeasureError {
    /// The task rejected its task data during validation.
    #[error("task data failed validation")]
    ValidationFailed,

    /// A phase after validation returned `false`.
    #[error("the {phase} phase reported failure")]
    PhaseFailed {
        /// The first phase that failed.
        phase: LifecycleOperation,
    },

    /// The measured time exceeded the configured maximum.
    #[error(
        "measured {:.10} s exceeds the maximum of {:.10} s",
        .elapsed.as_secs_f64(),
        .max.as_secs_f64()
    )]
    TimeBudgetExceeded {
        /// The measured time.
        elapsed: Duration,
        /// The configured maximum.
        max: Duration,
    },

    /// The requested mode cannot be measured.
    #[error("performance mode '{0}' cannot be measured")]
    UnsupportedMode(PerfMode),

    /// The worker threads that parallel variants run on could not be started.
    #[error("cannot start {threads} worker threads: {reason}")]
    WorkerPoolUnavailable {
        /// The requested number of worker threads.
        threads: usize,
        /// What the thread pool builder reported.
        reason: String,
    },
}

/// A specialized `Result` type for measurements.
pub(crate) type Result<T> = std::result::Result<T, MeasureError>;

/// Why a (task, variant) pair was not measured.
///
/// Skipping is not an error: the pair is structurally inapplicable to the execution
/// environment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
#[non_exhaustive]
pub enum SkipReason {
    /// The variant needs a distributed runtime and none is active.
    #[display("the variant needs an active distributed runtime")]
    DistributedRuntimeInactive,
}
