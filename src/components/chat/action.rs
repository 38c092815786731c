use crate::components::google_calendar::CalendarEvent;
use crate::error::{chat_error, AppResult};
use crate::utils::time::{normalize_time, parse_date};
use serde::{Deserialize, Serialize};
use serde_json::{from_str, Deserializer, Value};
use tracing::{debug, warn};

/// Event fields as the model writes them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl EventDraft {
    /// Check the draft and normalize its times to HH:MM
    pub fn validate(&self) -> AppResult<EventDraft> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(chat_error("Event title cannot be empty"));
        }
        if parse_date(&self.date).is_none() {
            return Err(chat_error(&format!("Invalid event date: {}", self.date)));
        }

        let time = normalize_optional(self.time.as_deref(), "time")?;
        let end_time = normalize_optional(self.end_time.as_deref(), "end time")?;
        if time.is_none() && end_time.is_some() {
            return Err(chat_error("An end time needs a start time"));
        }

        Ok(EventDraft {
            title: title.to_string(),
            date: self.date.trim().to_string(),
            time,
            end_time,
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        })
    }

    /// A new local event from a valid draft
    pub fn into_event(self) -> AppResult<CalendarEvent> {
        let draft = self.validate()?;
        let mut event = CalendarEvent::new(&draft.title, &draft.date, draft.time.as_deref());
        event.end_time = draft.end_time;
        event.description = draft.description;
        Ok(event)
    }
}

fn normalize_optional(value: Option<&str>, what: &str) -> AppResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => normalize_time(raw)
            .map(Some)
            .ok_or_else(|| chat_error(&format!("Invalid event {}: {}", what, raw))),
    }
}

/// Calendar change requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CalendarAction {
    AddEvent {
        event: EventDraft,
    },
    UpdateEvent {
        original_title: String,
        #[serde(default)]
        original_date: Option<String>,
        event: EventDraft,
    },
    DeleteEvent {
        title: String,
        #[serde(default)]
        date: Option<String>,
    },
}

/// Split a reply into its visible text and an optional action.
///
/// A fenced ```json block wins over a bare object. Anything that does not parse
/// as a known action leaves the reply untouched.
pub fn parse_action(reply: &str) -> (String, Option<CalendarAction>) {
    if let Some((start, end, body)) = fenced_json(reply) {
        if let Some(action) = decode(body) {
            return (strip(reply, start, end), Some(action));
        }
    }

    if let Some((start, end, value)) = bare_object(reply) {
        if let Some(action) = decode_value(value) {
            return (strip(reply, start, end), Some(action));
        }
    }

    (reply.trim().to_string(), None)
}

/// Byte range of the first ```json fence and its body
fn fenced_json(reply: &str) -> Option<(usize, usize, &str)> {
    let start = reply.find("```json")?;
    let body_start = start + "```json".len();
    let body_len = reply[body_start..].find("```")?;
    let end = body_start + body_len + "```".len();
    Some((start, end, &reply[body_start..body_start + body_len]))
}

/// Byte range and value of the last JSON object in the reply that names an action
fn bare_object(reply: &str) -> Option<(usize, usize, Value)> {
    for (start, _) in reply.match_indices('{').rev() {
        let mut values = Deserializer::from_str(&reply[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = values.next() {
            if value.get("action").is_some() {
                return Some((start, start + values.byte_offset(), value));
            }
        }
    }
    None
}

fn decode(json: &str) -> Option<CalendarAction> {
    // Only objects that name an action are considered
    let value: Value = from_str(json.trim()).ok()?;
    value.get("action")?;
    decode_value(value)
}

fn decode_value(value: Value) -> Option<CalendarAction> {
    match serde_json::from_value::<CalendarAction>(value) {
        Ok(action) => {
            debug!("Parsed calendar action: {:?}", action);
            Some(action)
        }
        Err(e) => {
            warn!("Ignoring malformed calendar action: {}", e);
            None
        }
    }
}

fn strip(reply: &str, start: usize, end: usize) -> String {
    let before = reply[..start].trim_end();
    let after = reply[end..].trim_start();
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (_, true) => before.to_string(),
        _ => format!("{}\n{}", before, after),
    }
}
