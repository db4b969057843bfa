// Injectable time source so that token expiry and rate-limit windows can be
// tested deterministically instead of sleeping in tests.

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

#[cfg(test)]
pub mod manual {
    use super::*;
    use chrono::Duration;
    use parking_lot::Mutex;

    /// A clock that only moves when the test tells it to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(start),
            })
        }

        pub fn at_epoch() -> Arc<Self> {
            Self::new(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap())
        }

        pub fn advance_secs(&self, secs: i64) {
            let mut now = self.now.lock();
            *now = *now + Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }
}
