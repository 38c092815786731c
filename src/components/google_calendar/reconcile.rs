use super::models::{CalendarEvent, EventQuery};
use crate::utils::time::parse_date;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Case-insensitive, whitespace-trimmed title comparison
pub fn titles_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Whether an event matches the query's title and, when given, its date
pub fn event_matches(event: &CalendarEvent, query: &EventQuery) -> bool {
    if !titles_match(&event.title, &query.title) {
        return false;
    }

    match query.date.as_deref() {
        Some(date) => event.date.trim() == date.trim(),
        None => true,
    }
}

/// Find the event a query refers to: provider id first, then title and date
pub fn find_match<'a>(events: &'a [CalendarEvent], query: &EventQuery) -> Option<&'a CalendarEvent> {
    if let Some(google_id) = &query.google_event_id {
        if let Some(event) = events
            .iter()
            .find(|e| e.google_event_id.as_ref() == Some(google_id))
        {
            return Some(event);
        }
    }

    events.iter().find(|event| event_matches(event, query))
}

/// Position of the matching event in a local list
pub fn find_match_index(events: &[CalendarEvent], query: &EventQuery) -> Option<usize> {
    let found = find_match(events, query)?;
    events.iter().position(|event| std::ptr::eq(event, found))
}

/// Sort events by date, all-day events first within a day
pub fn sort_events(events: &mut [CalendarEvent]) {
    events.sort_by(|a, b| {
        (a.date.as_str(), a.time.as_deref()).cmp(&(b.date.as_str(), b.time.as_deref()))
    });
}

/// Merge events pulled from the provider into the local list.
///
/// Local events linked to a provider id take the remote fields but keep their local id.
/// Linked events inside the pulled window that the provider no longer returns are
/// dropped. Purely local events are always kept.
pub fn merge_remote(
    local: &[CalendarEvent],
    remote: Vec<CalendarEvent>,
    window: (NaiveDate, NaiveDate),
) -> Vec<CalendarEvent> {
    let mut remote_by_id: HashMap<String, CalendarEvent> = remote
        .into_iter()
        .filter_map(|event| event.google_event_id.clone().map(|id| (id, event)))
        .collect();

    let mut merged = Vec::with_capacity(local.len() + remote_by_id.len());

    for event in local {
        match &event.google_event_id {
            Some(google_id) => {
                if let Some(remote_event) = remote_by_id.remove(google_id) {
                    merged.push(CalendarEvent {
                        id: event.id.clone(),
                        ..remote_event
                    });
                } else if !in_window(&event.date, window) {
                    merged.push(event.clone());
                }
            }
            None => merged.push(event.clone()),
        }
    }

    merged.extend(remote_by_id.into_values());
    sort_events(&mut merged);
    merged
}

fn in_window(date: &str, (start, end): (NaiveDate, NaiveDate)) -> bool {
    match parse_date(date) {
        Some(date) => date >= start && date <= end,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, date: &str, google_id: Option<&str>) -> CalendarEvent {
        CalendarEvent {
            google_event_id: google_id.map(str::to_string),
            ..CalendarEvent::new(title, date, None)
        }
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_titles_match_ignores_case_and_whitespace() {
        assert!(titles_match("  Dentist ", "dentist"));
        assert!(titles_match("KÄRPÄSET", "kärpäset"));
        assert!(!titles_match("Dentist", "Dentist appointment"));
    }

    #[test]
    fn test_find_match_with_and_without_date() {
        let events = vec![
            event("Dentist", "2024-01-10", None),
            event("Dentist", "2024-01-20", None),
        ];

        let any = find_match(&events, &EventQuery::new("dentist", None)).unwrap();
        assert_eq!(any.date, "2024-01-10");

        let dated = find_match(&events, &EventQuery::new("DENTIST", Some("2024-01-20"))).unwrap();
        assert_eq!(dated.date, "2024-01-20");

        assert!(find_match(&events, &EventQuery::new("Dentist", Some("2024-01-11"))).is_none());
    }

    #[test]
    fn test_find_match_prefers_google_id() {
        let events = vec![
            event("Renamed", "2024-01-10", Some("g1")),
            event("Dentist", "2024-01-10", None),
        ];

        let query = EventQuery::new("Dentist", None).with_google_id(Some("g1".to_string()));
        assert_eq!(find_match(&events, &query).unwrap().title, "Renamed");
        assert_eq!(find_match_index(&events, &query), Some(0));

        let query = EventQuery::new("Dentist", None).with_google_id(Some("gone".to_string()));
        assert_eq!(find_match_index(&events, &query), Some(1));
    }

    #[test]
    fn test_merge_remote() {
        let local = vec![
            event("Local only", "2024-01-05", None),
            event("Old title", "2024-01-06", Some("g1")),
            event("Deleted remotely", "2024-01-07", Some("g2")),
            event("Outside window", "2024-03-01", Some("g3")),
        ];
        let kept_id = local[1].id.clone();

        let remote = vec![
            event("New title", "2024-01-06", Some("g1")),
            event("Brand new", "2024-01-04", Some("g4")),
        ];

        let merged = merge_remote(&local, remote, window());
        let titles: Vec<&str> = merged.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Brand new", "Local only", "New title", "Outside window"]
        );

        let updated = merged.iter().find(|e| e.title == "New title").unwrap();
        assert_eq!(updated.id, kept_id);
    }

    #[test]
    fn test_merge_remote_window_edges_are_inclusive() {
        let local = vec![
            event("First day", "2024-01-01", Some("g5")),
            event("Last day", "2024-01-31", Some("g6")),
            event("Day after", "2024-02-01", Some("g7")),
        ];

        let merged = merge_remote(&local, Vec::new(), window());
        let titles: Vec<&str> = merged.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Day after"]);

        let remote = vec![event("Last day", "2024-01-31", Some("g6"))];
        let merged = merge_remote(&local, remote, window());
        assert!(merged.iter().any(|e| e.google_event_id.as_deref() == Some("g6")));
    }

    #[test]
    fn test_sort_events_all_day_first() {
        let mut events = vec![
            CalendarEvent::new("Late", "2024-01-05", Some("18:00")),
            CalendarEvent::new("Early", "2024-01-05", Some("08:00")),
            CalendarEvent::new("All day", "2024-01-05", None),
            CalendarEvent::new("Yesterday", "2024-01-04", Some("23:00")),
        ];
        sort_events(&mut events);

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Yesterday", "All day", "Early", "Late"]);
    }
}
