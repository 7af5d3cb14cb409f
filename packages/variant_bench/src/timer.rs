use std::time::{Duration, Instant};

use crate::pal::{Clock, ClockFacade};

/// Monotonic clock used to time the measured region.
///
/// Timestamps are taken immediately around the measured region and the difference is kept at
/// the resolution of [`Duration`] (nanoseconds).
#[derive(Debug)]
pub(crate) struct Timer {
    clock: ClockFacade,
}

impl Timer {
    pub(crate) fn new() -> Self {
        Self::with_clock(ClockFacade::real())
    }

    pub(crate) fn with_clock(clock: ClockFacade) -> Self {
        Self { clock }
    }

    /// Takes the start timestamp.
    pub(crate) fn start(&self) -> Stopwatch<'_> {
        Stopwatch {
            timer: self,
            started: self.clock.now(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Stopwatch<'t> {
    timer: &'t Timer,
    started: Instant,
}

impl Stopwatch<'_> {
    /// Takes the end timestamp and returns the time since the start timestamp.
    ///
    /// A clock that moves backwards yields zero rather than an error.
    pub(crate) fn stop(self) -> Duration {
        self.timer
            .clock
            .now()
            .saturating_duration_since(self.started)
    }
}
