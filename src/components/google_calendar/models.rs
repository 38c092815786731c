use serde::{Deserialize, Serialize};

/// Calendar event as the assistant keeps it.
///
/// `time == None` marks an all-day event. Dates are `YYYY-MM-DD`, times `HH:MM`
/// in the configured timezone.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub google_event_id: Option<String>,
}

impl CalendarEvent {
    /// New local event with a fresh id
    pub fn new(title: &str, date: &str, time: Option<&str>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            date: date.trim().to_string(),
            time: time.map(|t| t.trim().to_string()),
            ..Default::default()
        }
    }

    pub fn is_all_day(&self) -> bool {
        self.time.is_none()
    }
}

/// How to find an event: by provider id first, else by title and optional date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub title: String,
    pub date: Option<String>,
    pub google_event_id: Option<String>,
}

impl EventQuery {
    pub fn new(title: &str, date: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            date: date.map(str::to_string),
            google_event_id: None,
        }
    }

    pub fn with_google_id(mut self, google_event_id: Option<String>) -> Self {
        self.google_event_id = google_event_id;
        self
    }
}

/// Google Calendar `EventDateTime`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Google Calendar event resource (the fields the assistant uses)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One page of an events list response
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
