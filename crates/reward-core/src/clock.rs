use chrono::{DateTime, Local, NaiveDate, Utc};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Wall-clock source. `today_key` returns `None` when the local calendar day
/// cannot be determined.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
    fn today_key(&self) -> Option<String>;
}

/// Local-time clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today_key(&self) -> Option<String> {
        Some(date_key(Local::now().date_naive()))
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-util"))]
mod manual {
    use super::{date_key, Clock};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::{Arc, Mutex, MutexGuard};

    #[derive(Debug)]
    struct ManualClockState {
        now: DateTime<Utc>,
        date_known: bool,
    }

    /// Hand-driven clock. Clones share the same instant, so a test can keep one
    /// handle while the engine owns another. Day keys are taken in UTC.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        inner: Arc<Mutex<ManualClockState>>,
    }

    impl ManualClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                inner: Arc::new(Mutex::new(ManualClockState {
                    now,
                    date_known: true,
                })),
            }
        }

        /// Clock at `hour:minute` UTC on the given day, or `None` when that
        /// instant does not exist.
        pub fn try_at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
            Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
                .single()
                .map(Self::new)
        }

        /// Panics on an out-of-range instant.
        pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
            Self::try_at(year, month, day, hour, minute).unwrap_or_else(|| {
                panic!("invalid instant {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}")
            })
        }

        fn lock(&self) -> MutexGuard<'_, ManualClockState> {
            self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        pub fn set(&self, now: DateTime<Utc>) {
            self.lock().now = now;
        }

        pub fn advance(&self, by: Duration) {
            let mut state = self.lock();
            state.now += by;
        }

        /// Make `today_key` report an undeterminable day until restored.
        pub fn set_date_known(&self, known: bool) {
            self.lock().date_known = known;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.lock().now
        }

        fn today_key(&self) -> Option<String> {
            let state = self.lock();
            state.date_known.then(|| date_key(state.now.date_naive()))
        }
    }
}
