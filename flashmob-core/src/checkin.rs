use chrono::{DateTime, Duration, Utc};

use crate::SessionStatus;

/// How many minutes before the start of a session check-in opens
pub const CHECKIN_LEAD_MINUTES: i64 = 15;

/// The closed interval during which participants may check in to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckinWindow {
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl CheckinWindow {
    pub fn new(start_time: DateTime<Utc>, duration_in_minutes: i32) -> Self {
        Self {
            opens_at: start_time - Duration::minutes(CHECKIN_LEAD_MINUTES),
            closes_at: start_time + Duration::minutes(duration_in_minutes as i64),
        }
    }

    /// Both ends of the window are inclusive
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.opens_at && now <= self.closes_at
    }
}

/// Returns true if a participant may check in at `now`.
pub fn is_checkin_open(
    status: SessionStatus,
    start_time: DateTime<Utc>,
    duration_in_minutes: i32,
    now: DateTime<Utc>,
) -> bool {
    status == SessionStatus::Active && CheckinWindow::new(start_time, duration_in_minutes).contains(now)
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let start = start();
        let duration = 90;
        let open = |now| is_checkin_open(SessionStatus::Active, start, duration, now);

        let opens_at = start - Duration::minutes(15);
        let closes_at = start + Duration::minutes(90);

        assert!(open(opens_at), "should be open exactly 15 minutes before start");
        assert!(open(closes_at), "should be open exactly at the end");
        assert!(open(start));

        assert!(!open(opens_at - Duration::seconds(1)));
        assert!(!open(closes_at + Duration::seconds(1)));
        assert!(!open(start - Duration::hours(2)));
    }

    #[test]
    fn test_window_requires_active_status() {
        let start = start();

        for status in SessionStatus::ALL {
            let open = is_checkin_open(status, start, 60, start);
            assert_eq!(open, status == SessionStatus::Active, "{status}");
        }
    }

    #[test]
    fn test_window_bounds() {
        let start = start();
        let window = CheckinWindow::new(start, 30);

        assert_eq!(window.opens_at, start - Duration::minutes(15));
        assert_eq!(window.closes_at, start + Duration::minutes(30));
    }
}
