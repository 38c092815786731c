use super::GenerationSettings;
use crate::components::google_calendar::CalendarEvent;
use crate::components::instances::documents::document_excerpt;
use crate::components::instances::{Document, MemoryStore};
use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt::Write;

/// Characters of each document included in the prompt
pub const DOCUMENT_EXCERPT_CHARS: usize = 4000;

/// Upcoming events listed in the prompt
pub const MAX_PROMPT_EVENTS: usize = 50;

const ACTION_INSTRUCTIONS: &str = r#"You can change the user's calendar. When the user asks to add, move, change or remove an event, answer normally and then append exactly one fenced JSON block:
```json
{"action": "add_event", "event": {"title": "...", "date": "YYYY-MM-DD", "time": "HH:MM", "end_time": "HH:MM", "description": "..."}}
```
```json
{"action": "update_event", "original_title": "...", "original_date": "YYYY-MM-DD", "event": {"title": "...", "date": "YYYY-MM-DD", "time": "HH:MM"}}
```
```json
{"action": "delete_event", "title": "...", "date": "YYYY-MM-DD"}
```
Omit "time" for all-day events. Optional fields may be left out. Never emit a JSON block unless the user asked for a calendar change."#;

/// Instance data injected into the system prompt
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub memory: MemoryStore,
    pub documents: Vec<Document>,
    pub events: Vec<CalendarEvent>,
}

fn format_event(event: &CalendarEvent) -> String {
    let mut line = format!("- {} {}", event.date, event.title);
    match (&event.time, &event.end_time) {
        (Some(start), Some(end)) => {
            let _ = write!(line, " ({}-{})", start, end);
        }
        (Some(start), None) => {
            let _ = write!(line, " ({})", start);
        }
        _ => line.push_str(" (all day)"),
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(line, ": {}", description);
    }
    line
}

/// Build the system prompt for the current settings and context
pub fn build_preamble(
    settings: &GenerationSettings,
    context: &PromptContext,
    now: DateTime<Tz>,
) -> String {
    let mut preamble = format!("Your name is {}.", settings.assistant_name);
    if !settings.system_prompt.trim().is_empty() {
        preamble.push('\n');
        preamble.push_str(settings.system_prompt.trim());
    }

    let _ = write!(
        preamble,
        "\n\nCurrent date and time: {} ({}, {}).",
        now.format("%Y-%m-%d %H:%M"),
        now.format("%A"),
        now.timezone().name()
    );

    let memory = &context.memory;
    for (heading, text) in [
        ("Information about the user", &memory.information),
        ("Standing requests from the user", &memory.permanent_requests),
        ("Requests for now", &memory.temporary_requests),
    ] {
        if !text.trim().is_empty() {
            let _ = write!(preamble, "\n\n## {}\n{}", heading, text.trim());
        }
    }

    if !context.documents.is_empty() {
        preamble.push_str("\n\n## Documents");
        for document in &context.documents {
            let _ = write!(
                preamble,
                "\n### {}\n{}",
                document.name,
                document_excerpt(document, DOCUMENT_EXCERPT_CHARS)
            );
        }
    }

    let today = now.date_naive().format("%Y-%m-%d").to_string();
    let upcoming: Vec<String> = context
        .events
        .iter()
        .filter(|event| event.date >= today)
        .take(MAX_PROMPT_EVENTS)
        .map(format_event)
        .collect();

    preamble.push_str("\n\n## Calendar");
    if upcoming.is_empty() {
        preamble.push_str("\nNo upcoming events.");
    } else {
        for line in upcoming {
            preamble.push('\n');
            preamble.push_str(&line);
        }
    }

    preamble.push_str("\n\n");
    preamble.push_str(ACTION_INSTRUCTIONS);

    preamble
}
