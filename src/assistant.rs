//! One unlocked instance wired to its chat session and, when available, Google.

use crate::components::chat::{CalendarAction, ChatModels, ChatSession, PromptContext};
use crate::components::google_auth::AuthClient;
use crate::components::google_calendar::reconcile::{find_match_index, merge_remote};
use crate::components::google_calendar::{CalendarEvent, EventQuery, GoogleCalendarHandle};
use crate::components::instances::documents::load_document;
use crate::components::instances::{Document, Instance, InstanceSettings, MemoryField, MemoryStore};
use crate::config::Config;
use crate::error::{instance_error, AppResult, Error};
use crate::utils::time::date_window;
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// What happened to the remote calendar for one action
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteSync {
    /// Sync disabled, no calendar component, or not signed in
    Skipped,
    Synced,
    /// The provider had no matching event
    NotFound,
    Failed(String),
}

impl fmt::Display for RemoteSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteSync::Skipped => write!(f, "not synced"),
            RemoteSync::Synced => write!(f, "synced to Google Calendar"),
            RemoteSync::NotFound => write!(f, "no matching Google Calendar event"),
            RemoteSync::Failed(reason) => write!(f, "Google Calendar sync failed: {}", reason),
        }
    }
}

/// Result of applying a calendar action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub summary: String,
    pub remote: RemoteSync,
}

/// Reply to one chat message
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub text: String,
    pub citations: Vec<String>,
    pub outcome: Option<ActionOutcome>,
}

pub struct Assistant {
    instance: Instance,
    settings: InstanceSettings,
    session: ChatSession,
    auth: Option<AuthClient>,
    calendar: Option<GoogleCalendarHandle>,
    tz: Tz,
    window_days: i64,
}

impl Assistant {
    /// Load an instance's data and start its chat session
    pub async fn open(
        instance: Instance,
        models: ChatModels,
        config: &Config,
        auth: Option<AuthClient>,
        calendar: Option<GoogleCalendarHandle>,
    ) -> AppResult<Self> {
        let settings = instance.settings().await?;
        let history = instance.chat_history().await?;
        let context = load_context(&instance).await?;

        let session = ChatSession::new(
            models,
            settings.generation(),
            context,
            history,
            config.tz(),
        );

        info!("Opened instance {}", instance.name());
        Ok(Self {
            instance,
            settings,
            session,
            auth,
            calendar,
            tz: config.tz(),
            window_days: config.calendar_window_days,
        })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn settings(&self) -> &InstanceSettings {
        &self.settings
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn auth(&self) -> Option<&AuthClient> {
        self.auth.as_ref()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Calendar handle when remote sync is on for this instance
    fn remote(&self) -> Option<&GoogleCalendarHandle> {
        self.calendar.as_ref().filter(|_| self.settings.calendar_sync)
    }

    /// Rebuild the prompt from the stored memory, documents and events
    pub async fn refresh_context(&mut self) -> AppResult<()> {
        let context = load_context(&self.instance).await?;
        self.session.refresh_context(context);
        Ok(())
    }

    /// Send a message, persist the exchange and apply any calendar action
    pub async fn chat(&mut self, text: &str) -> AppResult<AssistantReply> {
        let turn = self.session.send(text).await?;
        self.instance
            .append_messages(&[turn.user_message.clone(), turn.assistant_message.clone()])
            .await?;

        let outcome = match turn.action {
            Some(action) => match self.apply_action(action).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!("Could not apply calendar action: {}", e);
                    Some(ActionOutcome {
                        summary: format!("Calendar change not applied: {}", e),
                        remote: RemoteSync::Skipped,
                    })
                }
            },
            None => None,
        };

        Ok(AssistantReply {
            text: turn.reply,
            citations: turn.citations,
            outcome,
        })
    }

    /// Apply a calendar action locally and, when enabled, to Google Calendar
    pub async fn apply_action(&mut self, action: CalendarAction) -> AppResult<ActionOutcome> {
        let mut events = self.instance.events().await?;

        let outcome = match action {
            CalendarAction::AddEvent { event } => {
                let mut event = event.into_event()?;
                let remote = match self.remote() {
                    Some(calendar) => match calendar.create_event(event.clone()).await {
                        Ok(created) => {
                            event.google_event_id = created.google_event_id;
                            RemoteSync::Synced
                        }
                        Err(e) => remote_failure("create", e),
                    },
                    None => RemoteSync::Skipped,
                };

                let summary = format!("Added \"{}\" on {}", event.title, describe_when(&event));
                events.push(event);
                ActionOutcome { summary, remote }
            }

            CalendarAction::UpdateEvent {
                original_title,
                original_date,
                event,
            } => {
                let draft = event.validate()?;
                let mut query = EventQuery::new(&original_title, original_date.as_deref());

                let local_index = find_match_index(&events, &query);
                let summary = match local_index {
                    Some(index) => {
                        let existing = &mut events[index];
                        query = query.with_google_id(existing.google_event_id.clone());

                        existing.title = draft.title.clone();
                        existing.date = draft.date.clone();
                        existing.time = draft.time.clone();
                        existing.end_time = draft.end_time.clone();
                        if draft.description.is_some() {
                            existing.description = draft.description.clone();
                        }
                        format!(
                            "Updated \"{}\" to \"{}\" on {}",
                            original_title,
                            existing.title,
                            describe_when(existing)
                        )
                    }
                    None => format!("No local event \"{}\" to update", original_title),
                };

                let remote = match self.remote() {
                    Some(calendar) => {
                        let updated = draft.into_event()?;
                        match calendar.update_matching(query, updated).await {
                            Ok(Some(google_id)) => {
                                // Link the local copy so the next pull does not duplicate it
                                if let Some(index) = local_index {
                                    events[index].google_event_id = Some(google_id);
                                }
                                RemoteSync::Synced
                            }
                            Ok(None) => RemoteSync::NotFound,
                            Err(e) => remote_failure("update", e),
                        }
                    }
                    None => RemoteSync::Skipped,
                };

                ActionOutcome { summary, remote }
            }

            CalendarAction::DeleteEvent { title, date } => {
                let mut query = EventQuery::new(&title, date.as_deref());

                let summary = match find_match_index(&events, &query) {
                    Some(index) => {
                        let removed = events.remove(index);
                        query = query.with_google_id(removed.google_event_id.clone());
                        format!("Deleted \"{}\" on {}", removed.title, describe_when(&removed))
                    }
                    None => format!("No local event \"{}\" to delete", title),
                };

                let remote = match self.remote() {
                    Some(calendar) => match calendar.delete_matching(query).await {
                        Ok(true) => RemoteSync::Synced,
                        Ok(false) => RemoteSync::NotFound,
                        Err(e) => remote_failure("delete", e),
                    },
                    None => RemoteSync::Skipped,
                };

                ActionOutcome { summary, remote }
            }
        };

        self.instance.save_events(&events).await?;
        self.refresh_context().await?;

        info!("{} ({})", outcome.summary, outcome.remote);
        Ok(outcome)
    }

    /// Pull upcoming Google events into the local list; returns the local event count
    pub async fn sync_calendar(&mut self) -> AppResult<usize> {
        let calendar = self
            .calendar
            .as_ref()
            .ok_or_else(|| instance_error("Google Calendar is not enabled"))?;

        // Query and merge over the same whole local days
        let today = Utc::now().with_timezone(&self.tz).date_naive();
        let last = today + Duration::days(self.window_days);
        let (time_min, time_max) = date_window(today, last, self.tz)?;
        let remote = calendar.list_events(time_min, time_max).await?;

        let local = self.instance.events().await?;
        let merged = merge_remote(&local, remote, (today, last));
        self.instance.save_events(&merged).await?;
        self.refresh_context().await?;

        info!(
            "Calendar synced for {}: {} events",
            self.instance.name(),
            merged.len()
        );
        Ok(merged.len())
    }

    pub async fn events(&self) -> AppResult<Vec<CalendarEvent>> {
        self.instance.events().await
    }

    /// Change one setting; returns whether the chat session was re-initialized
    pub async fn update_setting(&mut self, key: &str, value: &str) -> AppResult<bool> {
        let mut settings = self.settings.clone();
        settings.set(key, value)?;
        self.instance.save_settings(&settings).await?;
        self.settings = settings;

        Ok(self.session.update_settings(self.settings.generation()))
    }

    pub async fn memory(&self) -> AppResult<MemoryStore> {
        self.instance.memory().await
    }

    /// Append a line to one of the memory fields
    pub async fn remember(&mut self, field: MemoryField, text: &str) -> AppResult<()> {
        if text.trim().is_empty() {
            return Err(instance_error("Nothing to remember"));
        }
        self.instance.append_memory(field, text).await?;
        self.refresh_context().await
    }

    pub async fn forget_temporary(&mut self) -> AppResult<()> {
        self.instance.clear_temporary_requests().await?;
        self.refresh_context().await
    }

    pub async fn documents(&self) -> AppResult<Vec<Document>> {
        self.instance.documents().await
    }

    /// Load a text file into the instance's documents
    pub async fn add_document(&mut self, path: &Path) -> AppResult<Document> {
        let document = load_document(path).await?;
        self.instance.add_document(document.clone()).await?;
        self.refresh_context().await?;
        Ok(document)
    }

    pub async fn remove_document(&mut self, name_or_id: &str) -> AppResult<bool> {
        let removed = self.instance.remove_document(name_or_id).await?;
        if removed {
            self.refresh_context().await?;
        }
        Ok(removed)
    }

    /// Forget the conversation
    pub async fn clear_chat(&mut self) -> AppResult<()> {
        self.instance.clear_chat().await?;
        self.session.clear_history();
        Ok(())
    }
}

async fn load_context(instance: &Instance) -> AppResult<PromptContext> {
    Ok(PromptContext {
        memory: instance.memory().await?,
        documents: instance.documents().await?,
        events: instance.events().await?,
    })
}

fn remote_failure(operation: &str, error: Error) -> RemoteSync {
    match error {
        Error::NotSignedIn => {
            info!("Not signed in to Google; calendar {} kept local", operation);
            RemoteSync::Skipped
        }
        other => {
            warn!("Google Calendar {} failed: {}", operation, other);
            RemoteSync::Failed(other.to_string())
        }
    }
}

fn describe_when(event: &CalendarEvent) -> String {
    match (&event.time, &event.end_time) {
        (Some(start), Some(end)) => format!("{} {}-{}", event.date, start, end),
        (Some(start), None) => format!("{} {}", event.date, start),
        _ => format!("{} (all day)", event.date),
    }
}
