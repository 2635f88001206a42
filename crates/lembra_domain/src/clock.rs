use chrono::{Local, NaiveDateTime};

/// Source of the current wall-clock instant, injected so tests can control
/// time. The whole system reasons in the local wall clock; timezone
/// conversions are out of scope.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the host's local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
