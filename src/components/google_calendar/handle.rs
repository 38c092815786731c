use super::actor::{GoogleCalendarActor, GoogleCalendarActorHandle};
use super::models::{CalendarEvent, EventQuery};
use crate::components::google_auth::AuthClient;
use crate::config::Config;
use crate::error::AppResult;
use crate::utils::time::upcoming_window;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for interacting with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarHandle {
    actor_handle: GoogleCalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl std::fmt::Debug for GoogleCalendarHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarHandle").finish_non_exhaustive()
    }
}

impl GoogleCalendarHandle {
    /// Create a new GoogleCalendarHandle and spawn the actor
    pub fn new(config: Arc<RwLock<Config>>, auth: AuthClient) -> Self {
        // Create the actor and get its handle
        let (mut actor, handle) = GoogleCalendarActor::new(config, auth);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Events between two instants
    pub async fn list_events(&self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> AppResult<Vec<CalendarEvent>> {
        self.actor_handle.list_events(time_min, time_max).await
    }

    /// Events from now to `days` days ahead
    pub async fn upcoming_events(&self, days: i64) -> AppResult<Vec<CalendarEvent>> {
        let (time_min, time_max) = upcoming_window(Utc::now(), days);
        self.list_events(time_min, time_max).await
    }

    /// Create an event and return it with its provider id
    pub async fn create_event(&self, event: CalendarEvent) -> AppResult<CalendarEvent> {
        self.actor_handle.create_event(event).await
    }

    /// Update a provider event by id
    pub async fn update_event(&self, google_id: &str, event: CalendarEvent) -> AppResult<bool> {
        self.actor_handle.update_event(google_id.to_string(), event).await
    }

    /// Delete a provider event by id
    pub async fn delete_event(&self, google_id: &str) -> AppResult<bool> {
        self.actor_handle.delete_event(google_id.to_string()).await
    }

    /// Find the provider event matching a title and optional date
    pub async fn find_matching(&self, query: EventQuery) -> AppResult<Option<CalendarEvent>> {
        self.actor_handle.find_matching(query).await
    }

    /// Update the provider event matching the query; returns its provider id
    pub async fn update_matching(&self, query: EventQuery, event: CalendarEvent) -> AppResult<Option<String>> {
        self.actor_handle.update_matching(query, event).await
    }

    /// Delete the provider event matching the query
    pub async fn delete_matching(&self, query: EventQuery) -> AppResult<bool> {
        self.actor_handle.delete_matching(query).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        self.actor_handle.shutdown().await
    }
}
