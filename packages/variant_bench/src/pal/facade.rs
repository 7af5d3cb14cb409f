use std::fmt::Debug;
#[cfg(test)]
use std::sync::Arc;
use std::time::Instant;

#[cfg(test)]
use crate::pal::MockClock;
use crate::pal::{BUILD_TARGET_CLOCK, BuildTargetClock, Clock};

#[derive(Clone)]
pub(crate) enum ClockFacade {
    Real(&'static BuildTargetClock),

    #[cfg(test)]
    Mock(Arc<MockClock>),
}

impl ClockFacade {
    pub(crate) fn real() -> Self {
        Self::Real(&BUILD_TARGET_CLOCK)
    }
}

impl Clock for ClockFacade {
    fn now(&self) -> Instant {
        match self {
            Self::Real(c) => c.now(),
            #[cfg(test)]
            Self::Mock(c) => c.now(),
        }
    }
}

#[cfg(test)]
impl From<MockClock> for ClockFacade {
    fn from(c: MockClock) -> Self {
        Self::Mock(Arc::new(c))
    }
}

impl Debug for ClockFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real(c) => c.fmt(f),
            #[cfg(test)]
            Self::Mock(c) => c.fmt(f),
        }
    }
}
