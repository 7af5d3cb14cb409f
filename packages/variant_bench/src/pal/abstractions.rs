use std::fmt::Debug;
use std::time::Instant;

/// Source of monotonic timestamps for the timed region of a measurement.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Clock: Debug + Send + Sync + 'static {
    fn now(&self) -> Instant;
}
