//! Wall-clock abstraction.
//!
//! RULE: Nothing in the core reads the system time directly.
//! Every handler receives "now" through a Clock, so elapsed-time
//! math (accrual, regen, daily resets) is exact under test.

use crate::types::Timestamp;
use chrono::{TimeZone, Utc};

pub trait Clock: Send {
    fn now(&self) -> Timestamp;
}

/// Production clock: the real system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Test clock pinned to a settable instant.
pub struct FixedClock {
    now: std::sync::Mutex<Timestamp>,
}

impl FixedClock {
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    /// Convenience constructor from a unix timestamp in seconds.
    pub fn at_unix(secs: i64) -> Self {
        Self::at(Utc.timestamp_opt(secs, 0).unwrap())
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.now.lock().unwrap();
        *guard += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}
