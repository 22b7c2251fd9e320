use std::time::Instant;

/// Monotonic time source injected into everything that measures elapsed time,
/// so tests can simulate waiting without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
