use time::macros::{format_description, time};
use time::{Date, Duration, OffsetDateTime, UtcOffset};

pub const NO_DEADLINE_LABEL: &str = "Time left: —";
pub const OVERDUE_LABEL: &str = "Deadline passed!";

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_MINUTE: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    pub label: String,
    pub is_overdue: bool,
    /// Time left until the deadline; `None` without a usable due date or once overdue.
    pub remaining: Option<Duration>,
}

impl Countdown {
    fn no_deadline() -> Self {
        Self {
            label: NO_DEADLINE_LABEL.to_string(),
            is_overdue: false,
            remaining: None,
        }
    }

    fn overdue() -> Self {
        Self {
            label: OVERDUE_LABEL.to_string(),
            is_overdue: true,
            remaining: None,
        }
    }
}

/// Resolves a `YYYY-MM-DD` due date to 23:59:59 of that day in local time.
///
/// The offset is the one in force on the due date, so a deadline across a
/// daylight-saving change is not off by an hour. When `now` is not in the
/// local offset, or the lookup is unavailable, `now`'s offset is used.
pub fn parse_due_end_of_day(raw: &str, now: OffsetDateTime) -> Option<OffsetDateTime> {
    end_of_day_with(raw, now, |instant| {
        let current = UtcOffset::local_offset_at(now).ok()?;
        if current != now.offset() {
            return None;
        }
        UtcOffset::local_offset_at(instant).ok()
    })
}

/// `offset_at` maps an instant to the local offset in force at it.
pub(crate) fn end_of_day_with<F>(raw: &str, now: OffsetDateTime, offset_at: F) -> Option<OffsetDateTime>
where
    F: Fn(OffsetDateTime) -> Option<UtcOffset>,
{
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(raw.trim(), &format).ok()?;
    let end_of_day = date.with_time(time!(23:59:59));
    let offset = offset_at(end_of_day.assume_utc()).unwrap_or_else(|| now.offset());
    Some(end_of_day.assume_offset(offset))
}

pub fn format_countdown(due_date: Option<&str>, now: OffsetDateTime) -> Countdown {
    let Some(raw) = due_date else {
        return Countdown::no_deadline();
    };
    let Some(deadline) = parse_due_end_of_day(raw, now) else {
        return Countdown::no_deadline();
    };

    let diff = deadline - now;
    if diff.is_negative() {
        return Countdown::overdue();
    }

    let total = diff.whole_seconds();
    let days = total / SECONDS_PER_DAY;
    let hours = (total % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    Countdown {
        label: format!("Time left: {days} days, {hours} hours, {minutes} min"),
        is_overdue: false,
        remaining: Some(diff),
    }
}

pub fn due_label(due_date: Option<&str>) -> String {
    match due_date {
        Some(date) => format!("Due: {date}"),
        None => "No deadline".to_string(),
    }
}

/// Wall-clock now in the local offset, falling back to UTC when the offset is unknown.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn absent_due_date_has_no_deadline_label() {
        let countdown = format_countdown(None, datetime!(2024-05-01 12:00 UTC));
        assert_eq!(countdown.label, NO_DEADLINE_LABEL);
        assert!(!countdown.is_overdue);
        assert_eq!(countdown.remaining, None);
    }

    #[test]
    fn malformed_due_date_degrades_to_no_deadline() {
        let now = datetime!(2024-05-01 12:00 UTC);
        for raw in ["tomorrow", "2024-13-01", "01/05/2024", "2024-5-1", ""] {
            let countdown = format_countdown(Some(raw), now);
            assert_eq!(countdown.label, NO_DEADLINE_LABEL, "input {raw:?}");
            assert!(!countdown.is_overdue);
        }
    }

    #[test]
    fn decomposes_remaining_time_into_days_hours_minutes() {
        // 23:59:59 on 05-03 minus 10:30:00 on 05-01 = 2d 13h 29m 59s
        let now = datetime!(2024-05-01 10:30 UTC);
        let countdown = format_countdown(Some("2024-05-03"), now);
        assert!(!countdown.is_overdue);
        assert_eq!(countdown.label, "Time left: 2 days, 13 hours, 29 min");
    }

    #[test]
    fn shows_zero_components_explicitly() {
        let now = datetime!(2024-05-01 23:59:00 UTC);
        let countdown = format_countdown(Some("2024-05-01"), now);
        assert_eq!(countdown.label, "Time left: 0 days, 0 hours, 0 min");
        assert!(!countdown.is_overdue);
    }

    #[test]
    fn deadline_is_end_of_day_in_local_offset() {
        let now = datetime!(2024-05-01 23:00 +02:00);
        let countdown = format_countdown(Some("2024-05-01"), now);
        assert!(!countdown.is_overdue);
        assert_eq!(countdown.remaining, Some(Duration::seconds(59 * 60 + 59)));
    }

    #[test]
    fn deadline_uses_offset_of_the_due_date() {
        let winter = datetime!(2024-03-01 12:00 +01:00);
        let summer_time = |instant: OffsetDateTime| {
            let month = instant.month() as u8;
            Some(if (4..=10).contains(&month) { offset!(+2) } else { offset!(+1) })
        };
        let deadline = end_of_day_with("2024-07-01", winter, summer_time).expect("valid date");
        assert_eq!(deadline, datetime!(2024-07-01 21:59:59 UTC));
        assert_eq!(deadline.offset(), offset!(+2));

        let same_season = end_of_day_with("2024-03-02", winter, summer_time).expect("valid date");
        assert_eq!(same_season, datetime!(2024-03-02 22:59:59 UTC));
    }

    #[test]
    fn deadline_falls_back_to_current_offset_without_lookup() {
        let now = datetime!(2024-03-01 12:00 +01:00);
        let deadline = end_of_day_with("2024-07-01", now, |_| None).expect("valid date");
        assert_eq!(deadline, datetime!(2024-07-01 23:59:59 +01:00));
        assert_eq!(end_of_day_with("July", now, |_| None), None);
    }

    #[test]
    fn past_deadline_is_overdue() {
        let now = datetime!(2099-06-01 00:00 UTC);
        let countdown = format_countdown(Some("2001-01-01"), now);
        assert!(countdown.is_overdue);
        assert_eq!(countdown.label, OVERDUE_LABEL);
        assert_eq!(countdown.remaining, None);
    }

    #[test]
    fn remaining_time_decreases_until_overdue() {
        let due = Some("2024-05-02");
        let mut now = datetime!(2024-05-01 00:00 UTC);
        let mut previous = format_countdown(due, now)
            .remaining
            .expect("deadline ahead");
        loop {
            now += Duration::minutes(97);
            let countdown = format_countdown(due, now);
            match countdown.remaining {
                Some(remaining) => {
                    assert!(remaining < previous);
                    previous = remaining;
                }
                None => {
                    assert!(countdown.is_overdue);
                    break;
                }
            }
        }
        for extra_hours in [1, 24, 24 * 365] {
            let later = format_countdown(due, now + Duration::hours(extra_hours));
            assert!(later.is_overdue);
            assert_eq!(later.label, OVERDUE_LABEL);
        }
    }

    #[test]
    fn due_label_shows_stored_value_as_given() {
        assert_eq!(due_label(Some("2024-05-01")), "Due: 2024-05-01");
        assert_eq!(due_label(Some("someday")), "Due: someday");
        assert_eq!(due_label(None), "No deadline");
    }
}
