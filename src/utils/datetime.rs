use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};

/// How dates are shown back to users.
pub const DISPLAY_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn format_datetime(dt: &DateTime<Utc>, offset: &FixedOffset) -> String {
    dt.with_timezone(offset).format(DISPLAY_FORMAT).to_string()
}

/// Storage form: RFC 3339, whole seconds, `Z` suffix. Fixed width, so stored
/// values compare correctly as text.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_db_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses `dd.mm` into a date of the given year.
pub fn parse_day_month(input: &str, year: i32) -> Option<NaiveDate> {
    let (day, month) = input.trim().split_once('.')?;
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Parses `hh:mm`.
pub fn parse_clock(input: &str) -> Option<NaiveTime> {
    let (hours, minutes) = input.trim().split_once(':')?;
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// Interprets a wall-clock date and time in the bot's offset.
pub fn local_to_utc(offset: &FixedOffset, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole hours between a reminder clock time and the event clock time.
/// A reminder time later than the event time means the previous day.
pub fn hours_before(event_time: NaiveTime, remind_time: NaiveTime) -> i64 {
    let mut gap = event_time.signed_duration_since(remind_time);
    if gap < Duration::zero() {
        gap += Duration::hours(24);
    }
    gap.num_hours()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn clock(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_day_month() {
        assert_eq!(parse_day_month("13.07", 2026), NaiveDate::from_ymd_opt(2026, 7, 13));
        assert_eq!(parse_day_month("1.1", 2026), NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(parse_day_month("31.04", 2026), None);
        assert_eq!(parse_day_month("29.02", 2026), None);
        assert_eq!(parse_day_month("29.02", 2028), NaiveDate::from_ymd_opt(2028, 2, 29));
        assert_eq!(parse_day_month("1307", 2026), None);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("12:00"), Some(clock(12, 0)));
        assert_eq!(parse_clock("9:05"), Some(clock(9, 5)));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("12:60"), None);
    }

    #[test]
    fn test_hours_before() {
        assert_eq!(hours_before(clock(12, 0), clock(10, 0)), 2);
        assert_eq!(hours_before(clock(12, 0), clock(12, 0)), 0);
        assert_eq!(hours_before(clock(9, 0), clock(21, 0)), 12);
        assert_eq!(hours_before(clock(12, 0), clock(10, 30)), 1);
    }

    #[test]
    fn test_db_timestamp_round_trip_drops_subseconds() {
        let dt = Utc.with_ymd_and_hms(2026, 7, 13, 9, 0, 0).unwrap();
        let stored = to_db_timestamp(&(dt + Duration::milliseconds(250)));
        assert_eq!(stored, "2026-07-13T09:00:00Z");
        assert_eq!(parse_db_timestamp(&stored), Some(dt));
    }

    #[test]
    fn test_format_datetime_applies_offset() {
        let dt = Utc.with_ymd_and_hms(2026, 7, 13, 9, 0, 0).unwrap();
        let moscow = FixedOffset::east_opt(3 * 3600).unwrap();
        assert_eq!(format_datetime(&dt, &moscow), "13.07.2026 12:00");
    }
}
