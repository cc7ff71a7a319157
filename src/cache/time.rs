//! Time source abstraction so expiry logic is deterministically testable.
//! Spec.md §6 "`time_provider` (default system)".

use std::time::{Duration, SystemTime};

/// Supplies "now" to the cache engine. The default implementation reads the
/// system clock; tests substitute a manually-advanced clock so sliding/
/// absolute expiry can be exercised without real sleeps.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock callers advance explicitly, for deterministic sliding/absolute
/// expiry tests.
pub struct MockTimeProvider {
    now: std::sync::Mutex<SystemTime>,
}

impl MockTimeProvider {
    pub fn new(start: SystemTime) -> Self {
        MockTimeProvider {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}
