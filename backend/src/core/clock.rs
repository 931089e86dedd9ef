//! Time management for the circulation engine
//!
//! Every operation reads "now" from a `Clock` so the engine stays
//! deterministic under test: production uses the system clock, tests pin
//! time with `FixedClock` and advance it day by day.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current instant for all engine operations.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The production clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned time for deterministic tests.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use circulation_core_rs::core::clock::{Clock, FixedClock};
///
/// let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
/// clock.advance_days(3);
/// assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap());
/// ```
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock pinned at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock to an explicit instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    /// Advance the clock by whole days.
    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock();
        *now += Duration::days(days);
    }

    /// Advance the clock by an arbitrary duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Days overdue, rounded up to whole days.
///
/// Returns 0 when `returned` is at or before `due`. A return one second
/// past the due instant already counts as one overdue day.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use circulation_core_rs::core::clock::overdue_days;
///
/// let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// assert_eq!(overdue_days(due, due), 0);
/// assert_eq!(overdue_days(due, due + Duration::seconds(1)), 1);
/// assert_eq!(overdue_days(due, due + Duration::days(10)), 10);
/// ```
pub fn overdue_days(due: DateTime<Utc>, returned: DateTime<Utc>) -> i64 {
    const SECONDS_PER_DAY: i64 = 86_400;

    let late_seconds = (returned - due).num_seconds();
    if late_seconds <= 0 {
        return 0;
    }
    (late_seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(base());
        clock.advance_days(2);
        assert_eq!(clock.now(), base() + Duration::days(2));

        clock.advance(Duration::hours(6));
        assert_eq!(clock.now(), base() + Duration::days(2) + Duration::hours(6));
    }

    #[test]
    fn test_fixed_clock_set() {
        let clock = FixedClock::new(base());
        let later = base() + Duration::days(30);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_overdue_days_on_time() {
        assert_eq!(overdue_days(base(), base()), 0);
        assert_eq!(overdue_days(base(), base() - Duration::days(1)), 0);
    }

    #[test]
    fn test_overdue_days_rounds_up() {
        assert_eq!(overdue_days(base(), base() + Duration::hours(1)), 1);
        assert_eq!(
            overdue_days(base(), base() + Duration::days(3) + Duration::minutes(5)),
            4
        );
    }

    #[test]
    fn test_overdue_days_exact_boundary() {
        assert_eq!(overdue_days(base(), base() + Duration::days(10)), 10);
    }
}
