use crate::error::{google_calendar_error, AppResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

/// Normalize a time string to zero-padded HH:MM
pub fn normalize_time(time_str: &str) -> Option<String> {
    let (hour, minute) = parse_time(time_str)?;
    Some(format!("{:02}:{:02}", hour, minute))
}

/// Parse a date in YYYY-MM-DD format
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()
}

/// Combine a date and an HH:MM time
pub fn naive_datetime(date: NaiveDate, time_str: &str) -> Option<NaiveDateTime> {
    let (hour, minute) = parse_time(time_str)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some(date.and_time(time))
}

/// Attach a timezone to a wall-clock time.
///
/// Ambiguous times take the earlier instant; times inside a DST gap are moved forward an hour.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> AppResult<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Ok(dt),
        chrono::LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        chrono::LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .ok_or_else(|| google_calendar_error(&format!("Invalid local time {}", naive))),
    }
}

fn start_of_day(date: NaiveDate) -> AppResult<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| google_calendar_error("Failed to create datetime"))
}

/// Start and end (exclusive) of a calendar day in the timezone
pub fn day_bounds(date: NaiveDate, tz: Tz) -> AppResult<(DateTime<Tz>, DateTime<Tz>)> {
    let next = date
        .succ_opt()
        .ok_or_else(|| google_calendar_error("Date out of range"))?;
    let start = localize(tz, start_of_day(date)?)?;
    let end = localize(tz, start_of_day(next)?)?;
    Ok((start, end))
}

/// Instants covering whole local days from `first` through `last`
pub fn date_window(first: NaiveDate, last: NaiveDate, tz: Tz) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, _) = day_bounds(first, tz)?;
    let (_, end) = day_bounds(last, tz)?;
    Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

/// Window from now to `days` days ahead
pub fn upcoming_window(now: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(days))
}

/// Date range for the current week (Monday to Sunday) as YYYY-MM-DD
pub fn get_weekly_date_range(today: NaiveDate) -> (String, String) {
    use chrono::Datelike;

    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let sunday = monday + Duration::days(6);

    (
        monday.format("%Y-%m-%d").to_string(),
        sunday.format("%Y-%m-%d").to_string(),
    )
}
