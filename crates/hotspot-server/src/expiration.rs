//! Access expiry computation
//!
//! Expirations are anchored to a fixed daily reset boundary (06:00 local)
//! instead of `now + delay`, so sessions granted late in the day still
//! expire at the same predictable morning cutoff.

use chrono::{Days, Local, NaiveDateTime, NaiveTime, TimeDelta};

/// Per-class access delays
#[derive(Debug, Clone, Copy)]
pub struct ExpirationPolicy {
    guest_delay: TimeDelta,
    staff_delay: TimeDelta,
}

impl ExpirationPolicy {
    pub fn new(guest_delay: TimeDelta, staff_delay: TimeDelta) -> Self {
        ExpirationPolicy {
            guest_delay,
            staff_delay,
        }
    }

    pub fn delay_for(&self, employee: bool) -> TimeDelta {
        if employee {
            self.staff_delay
        } else {
            self.guest_delay
        }
    }

    /// Next expiry instant for a grant issued now
    pub fn next_expiration(&self, employee: bool) -> NaiveDateTime {
        self.next_expiration_from(employee, Local::now().naive_local())
    }

    /// Anchor at today 06:00, add the class delay, and roll forward one day
    /// if that already passed
    pub(crate) fn next_expiration_from(&self, employee: bool, now: NaiveDateTime) -> NaiveDateTime {
        let anchor = now
            .date()
            .and_time(NaiveTime::from_hms_opt(6, 0, 0).expect("06:00 is a valid time"));
        let mut expires = anchor + self.delay_for(employee);
        if expires <= now {
            expires = expires
                .checked_add_days(Days::new(1))
                .unwrap_or(NaiveDateTime::MAX);
        }
        expires
    }
}

/// The deauthorization timestamp: everything compares as already expired
pub fn epoch() -> NaiveDateTime {
    NaiveDateTime::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn policy() -> ExpirationPolicy {
        ExpirationPolicy::new(TimeDelta::days(1), TimeDelta::days(30))
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn guest_expires_next_morning() {
        let now = at(2024, 3, 10, 14, 30);
        let expires = policy().next_expiration_from(false, now);
        assert_eq!(expires, at(2024, 3, 11, 6, 0));
    }

    #[test]
    fn staff_gets_thirty_days() {
        let now = at(2024, 3, 10, 14, 30);
        let expires = policy().next_expiration_from(true, now);
        assert_eq!(expires, at(2024, 4, 9, 6, 0));
    }

    #[test]
    fn short_delay_rolls_to_tomorrow() {
        // 2h delay puts the candidate at 08:00, already past by mid-day
        let policy = ExpirationPolicy::new(TimeDelta::hours(2), TimeDelta::days(30));
        let now = at(2024, 3, 10, 14, 30);
        let expires = policy.next_expiration_from(false, now);
        assert_eq!(expires, at(2024, 3, 11, 8, 0));
    }

    #[test]
    fn always_in_the_future() {
        let policy = policy();
        for hour in 0..24 {
            for employee in [false, true] {
                let now = at(2024, 3, 10, hour, 0);
                assert!(
                    policy.next_expiration_from(employee, now) > now,
                    "expiry not in the future at hour {} (employee={})",
                    hour,
                    employee
                );
            }
        }
    }

    #[test]
    fn epoch_is_always_expired() {
        assert!(epoch() < Local::now().naive_local());
    }
}
