use std::time::Instant;

use crate::pal::Clock;

/// Singleton instance of `BuildTargetClock`, used by public API types
/// to hook up to the real clock.
pub(crate) static BUILD_TARGET_CLOCK: BuildTargetClock = BuildTargetClock;

#[derive(Debug)]
pub(crate) struct BuildTargetClock;

impl Clock for BuildTargetClock {
    #[cfg_attr(test, mutants::skip)] // Real time cannot be asserted exactly.
    fn now(&self) -> Instant {
        Instant::now()
    }
}
