use super::models::{CalendarEvent, EventDateTime, GoogleEvent};
use crate::error::{google_calendar_error, AppResult};
use crate::utils::time::{localize, naive_datetime, parse_date};
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use tracing::debug;

/// Convert an assistant event into the Google shape
pub fn to_google(event: &CalendarEvent, tz: Tz) -> AppResult<GoogleEvent> {
    let date = parse_date(&event.date)
        .ok_or_else(|| google_calendar_error(&format!("Invalid event date: {}", event.date)))?;

    let (start, end) = match &event.time {
        None => {
            // All-day end dates are exclusive
            let next = date
                .succ_opt()
                .ok_or_else(|| google_calendar_error("Event date out of range"))?;
            (
                EventDateTime {
                    date: Some(date.format("%Y-%m-%d").to_string()),
                    ..Default::default()
                },
                EventDateTime {
                    date: Some(next.format("%Y-%m-%d").to_string()),
                    ..Default::default()
                },
            )
        }
        Some(time) => {
            let start_naive = naive_datetime(date, time)
                .ok_or_else(|| google_calendar_error(&format!("Invalid event time: {}", time)))?;
            let start = localize(tz, start_naive)?;

            let end = match &event.end_time {
                Some(end_time) => {
                    let mut end_naive = naive_datetime(date, end_time).ok_or_else(|| {
                        google_calendar_error(&format!("Invalid event end time: {}", end_time))
                    })?;
                    // An end before the start runs past midnight
                    if end_naive <= start_naive {
                        end_naive += Duration::days(1);
                    }
                    localize(tz, end_naive)?
                }
                None => start + Duration::hours(1),
            };

            (
                EventDateTime {
                    date_time: Some(start.to_rfc3339()),
                    time_zone: Some(tz.name().to_string()),
                    ..Default::default()
                },
                EventDateTime {
                    date_time: Some(end.to_rfc3339()),
                    time_zone: Some(tz.name().to_string()),
                    ..Default::default()
                },
            )
        }
    };

    Ok(GoogleEvent {
        id: event.google_event_id.clone(),
        summary: Some(event.title.clone()),
        description: event.description.clone(),
        start: Some(start),
        end: Some(end),
        status: None,
    })
}

/// Convert a Google event into the assistant shape.
///
/// Returns `None` for cancelled events and events without a usable start.
pub fn from_google(event: &GoogleEvent, tz: Tz) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let start = event.start.as_ref()?;

    let (date, time) = if let Some(date) = &start.date {
        (parse_date(date)?.format("%Y-%m-%d").to_string(), None)
    } else if let Some(date_time) = &start.date_time {
        let local = DateTime::parse_from_rfc3339(date_time).ok()?.with_timezone(&tz);
        (
            local.format("%Y-%m-%d").to_string(),
            Some(local.format("%H:%M").to_string()),
        )
    } else {
        debug!("Skipping event without start: {:?}", event.id);
        return None;
    };

    let end_time = match (&time, event.end.as_ref().and_then(|end| end.date_time.as_ref())) {
        (Some(_), Some(end)) => DateTime::parse_from_rfc3339(end)
            .ok()
            .map(|dt| dt.with_timezone(&tz).format("%H:%M").to_string()),
        _ => None,
    };

    Some(CalendarEvent {
        id: uuid::Uuid::new_v4().to_string(),
        title: event.summary.clone().unwrap_or_default(),
        date,
        time,
        end_time,
        description: event.description.clone().filter(|d| !d.is_empty()),
        google_event_id: event.id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helsinki() -> Tz {
        "Europe/Helsinki".parse().unwrap()
    }

    #[test]
    fn test_all_day_to_google_uses_exclusive_end() {
        let event = CalendarEvent::new("Juhannus", "2024-06-21", None);
        let google = to_google(&event, helsinki()).unwrap();

        let start = google.start.unwrap();
        let end = google.end.unwrap();
        assert_eq!(start.date.as_deref(), Some("2024-06-21"));
        assert_eq!(end.date.as_deref(), Some("2024-06-22"));
        assert!(start.date_time.is_none());
        assert_eq!(google.summary.as_deref(), Some("Juhannus"));
    }

    #[test]
    fn test_timed_to_google_defaults_to_one_hour() {
        let event = CalendarEvent::new("Dentist", "2024-01-15", Some("14:30"));
        let google = to_google(&event, helsinki()).unwrap();

        let start = google.start.unwrap();
        let end = google.end.unwrap();
        assert_eq!(start.date_time.as_deref(), Some("2024-01-15T14:30:00+02:00"));
        assert_eq!(end.date_time.as_deref(), Some("2024-01-15T15:30:00+02:00"));
        assert_eq!(start.time_zone.as_deref(), Some("Europe/Helsinki"));
    }

    #[test]
    fn test_end_before_start_rolls_over_midnight() {
        let mut event = CalendarEvent::new("Night shift", "2024-01-15", Some("22:00"));
        event.end_time = Some("06:00".to_string());
        let google = to_google(&event, Tz::UTC).unwrap();

        assert_eq!(
            google.end.unwrap().date_time.as_deref(),
            Some("2024-01-16T06:00:00+00:00")
        );
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let event = CalendarEvent::new("Bad", "15.1.2024", None);
        assert!(to_google(&event, Tz::UTC).is_err());

        let event = CalendarEvent::new("Bad", "2024-01-15", Some("25:00"));
        assert!(to_google(&event, Tz::UTC).is_err());
    }

    #[test]
    fn test_from_google_timed_converts_timezone() {
        let google = GoogleEvent {
            id: Some("g1".to_string()),
            summary: Some("Standup".to_string()),
            start: Some(EventDateTime {
                date_time: Some("2024-01-15T08:00:00Z".to_string()),
                ..Default::default()
            }),
            end: Some(EventDateTime {
                date_time: Some("2024-01-15T08:15:00Z".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let event = from_google(&google, helsinki()).unwrap();
        assert_eq!(event.title, "Standup");
        assert_eq!(event.date, "2024-01-15");
        assert_eq!(event.time.as_deref(), Some("10:00"));
        assert_eq!(event.end_time.as_deref(), Some("10:15"));
        assert_eq!(event.google_event_id.as_deref(), Some("g1"));
    }

    #[test]
    fn test_from_google_all_day() {
        let google = GoogleEvent {
            id: Some("g2".to_string()),
            summary: Some("Holiday".to_string()),
            description: Some(String::new()),
            start: Some(EventDateTime {
                date: Some("2024-12-24".to_string()),
                ..Default::default()
            }),
            end: Some(EventDateTime {
                date: Some("2024-12-25".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let event = from_google(&google, helsinki()).unwrap();
        assert!(event.is_all_day());
        assert_eq!(event.date, "2024-12-24");
        assert!(event.end_time.is_none());
        assert!(event.description.is_none());
    }

    #[test]
    fn test_from_google_skips_cancelled_and_startless() {
        let cancelled = GoogleEvent {
            status: Some("cancelled".to_string()),
            start: Some(EventDateTime {
                date: Some("2024-12-24".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(from_google(&cancelled, Tz::UTC).is_none());
        assert!(from_google(&GoogleEvent::default(), Tz::UTC).is_none());
    }

    #[test]
    fn test_google_event_serializes_camel_case() {
        let event = CalendarEvent::new("Dentist", "2024-01-15", Some("14:30"));
        let json = serde_json::to_value(to_google(&event, Tz::UTC).unwrap()).unwrap();
        assert_eq!(json["start"]["dateTime"], "2024-01-15T14:30:00+00:00");
        assert_eq!(json["start"]["timeZone"], "UTC");
        assert!(json.get("id").is_none());
    }
}
