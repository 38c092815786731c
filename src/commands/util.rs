use crate::assistant::{ActionOutcome, AssistantReply};
use crate::components::google_calendar::CalendarEvent;
use crate::components::instances::InstanceSettings;
use std::fmt::Write;

const HELP: &str = "\
Type a message to chat, or use a command:
  /events                        list saved calendar events
  /sync                          pull upcoming events from Google Calendar
  /add <date> [time] <title>     add an event (date YYYY-MM-DD, time HH:MM)
  /delete <title> [date]         delete an event
  /memory                        show what the assistant remembers
  /remember <text>               remember information about you
  /request <text>                add a standing request
  /temp <text>                   add a request for now
  /forget-temp                   clear requests for now
  /docs                          list documents
  /doc add <path>                add a text document
  /doc rm <name>                 remove a document
  /settings                      show settings
  /set <key> <value>             change a setting (name, model, temperature,
                                 max_tokens, prompt, search, calendar)
  /clear                         clear the chat history
  /login  /whoami  /logout       Google account
  /help                          this help
  /quit                          leave";

pub fn help_text() -> String {
    HELP.to_string()
}

/// One event as a list line
pub fn format_event(event: &CalendarEvent) -> String {
    let when = match (&event.time, &event.end_time) {
        (Some(start), Some(end)) => format!("{}-{}", start, end),
        (Some(start), None) => start.clone(),
        _ => "all day".to_string(),
    };
    let mut line = format!("{}  {:<11}  {}", event.date, when, event.title);
    if event.google_event_id.is_some() {
        line.push_str("  [google]");
    }
    line
}

pub fn format_outcome(outcome: &ActionOutcome) -> String {
    format!("{} ({})", outcome.summary, outcome.remote)
}

/// Assistant reply with sources and any calendar change
pub fn format_chat_reply(settings: &InstanceSettings, reply: &AssistantReply) -> String {
    let mut text = format!("{}: {}", settings.assistant_name, reply.text);

    if !reply.citations.is_empty() {
        text.push_str("\n\nSources:");
        for (index, uri) in reply.citations.iter().enumerate() {
            let _ = write!(text, "\n  [{}] {}", index + 1, uri);
        }
    }

    if let Some(outcome) = &reply.outcome {
        let _ = write!(text, "\n\n* {}", format_outcome(outcome));
    }

    text
}

pub fn format_settings(settings: &InstanceSettings) -> String {
    let on_off = |value: bool| if value { "on" } else { "off" };
    format!(
        "name:        {}\nmodel:       {}\ntemperature: {}\nmax_tokens:  {}\nsearch:      {}\ncalendar:    {}\nprompt:      {}",
        settings.assistant_name,
        settings.model,
        settings.temperature,
        settings
            .max_output_tokens
            .map(|n| n.to_string())
            .unwrap_or_else(|| "default".to_string()),
        on_off(settings.search_grounding),
        on_off(settings.calendar_sync),
        settings.system_prompt
    )
}
