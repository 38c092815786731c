use super::convert::{from_google, to_google};
use super::models::{CalendarEvent, EventList, EventQuery, GoogleEvent};
use super::reconcile::find_match;
use crate::components::google_auth::AuthClient;
use crate::config::Config;
use crate::error::{google_calendar_error, AppResult};
use crate::utils::time::{day_bounds, parse_date, upcoming_window};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<AppResult<T>>;

/// The Google Calendar actor that processes messages
pub struct GoogleCalendarActor {
    config: Arc<RwLock<Config>>,
    auth: AuthClient,
    client: Client,
    command_rx: mpsc::Receiver<GoogleCalendarCommand>,
}

/// Commands that can be sent to the Google Calendar actor
pub enum GoogleCalendarCommand {
    ListEvents(DateTime<Utc>, DateTime<Utc>, Reply<Vec<CalendarEvent>>),
    CreateEvent(CalendarEvent, Reply<CalendarEvent>),
    UpdateEvent(String, CalendarEvent, Reply<bool>),
    DeleteEvent(String, Reply<bool>),
    FindMatching(EventQuery, Reply<Option<CalendarEvent>>),
    UpdateMatching(EventQuery, CalendarEvent, Reply<Option<String>>),
    DeleteMatching(EventQuery, Reply<bool>),
    Shutdown,
}

/// Handle for communicating with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarActorHandle {
    command_tx: mpsc::Sender<GoogleCalendarCommand>,
}

impl GoogleCalendarActorHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> GoogleCalendarCommand) -> AppResult<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(build(response_tx))
            .await
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| google_calendar_error("Response channel closed"))?
    }

    pub async fn list_events(&self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> AppResult<Vec<CalendarEvent>> {
        self.request(|tx| GoogleCalendarCommand::ListEvents(time_min, time_max, tx)).await
    }

    pub async fn create_event(&self, event: CalendarEvent) -> AppResult<CalendarEvent> {
        self.request(|tx| GoogleCalendarCommand::CreateEvent(event, tx)).await
    }

    pub async fn update_event(&self, google_id: String, event: CalendarEvent) -> AppResult<bool> {
        self.request(|tx| GoogleCalendarCommand::UpdateEvent(google_id, event, tx)).await
    }

    pub async fn delete_event(&self, google_id: String) -> AppResult<bool> {
        self.request(|tx| GoogleCalendarCommand::DeleteEvent(google_id, tx)).await
    }

    pub async fn find_matching(&self, query: EventQuery) -> AppResult<Option<CalendarEvent>> {
        self.request(|tx| GoogleCalendarCommand::FindMatching(query, tx)).await
    }

    pub async fn update_matching(&self, query: EventQuery, event: CalendarEvent) -> AppResult<Option<String>> {
        self.request(|tx| GoogleCalendarCommand::UpdateMatching(query, event, tx)).await
    }

    pub async fn delete_matching(&self, query: EventQuery) -> AppResult<bool> {
        self.request(|tx| GoogleCalendarCommand::DeleteMatching(query, tx)).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(GoogleCalendarCommand::Shutdown).await;
        Ok(())
    }
}

impl GoogleCalendarActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>, auth: AuthClient) -> (Self, GoogleCalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            config,
            auth,
            client: Client::new(),
            command_rx,
        };

        let handle = GoogleCalendarActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Google Calendar actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                GoogleCalendarCommand::ListEvents(time_min, time_max, response_tx) => {
                    let _ = response_tx.send(self.list_events(time_min, time_max).await);
                }
                GoogleCalendarCommand::CreateEvent(event, response_tx) => {
                    let _ = response_tx.send(self.create_event(event).await);
                }
                GoogleCalendarCommand::UpdateEvent(google_id, event, response_tx) => {
                    let _ = response_tx.send(self.update_event(&google_id, &event).await);
                }
                GoogleCalendarCommand::DeleteEvent(google_id, response_tx) => {
                    let _ = response_tx.send(self.delete_event(&google_id).await);
                }
                GoogleCalendarCommand::FindMatching(query, response_tx) => {
                    let _ = response_tx.send(self.find_matching(&query).await);
                }
                GoogleCalendarCommand::UpdateMatching(query, event, response_tx) => {
                    let _ = response_tx.send(self.update_matching(&query, &event).await);
                }
                GoogleCalendarCommand::DeleteMatching(query, response_tx) => {
                    let _ = response_tx.send(self.delete_matching(&query).await);
                }
                GoogleCalendarCommand::Shutdown => {
                    info!("Google Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Google Calendar actor shut down");
    }

    async fn events_url(&self, google_id: Option<&str>) -> String {
        let config = self.config.read().await;
        let base = format!(
            "{}/calendars/{}/events",
            config.endpoints.google_calendar_api,
            urlencoding::encode(&config.google_calendar_id)
        );

        match google_id {
            Some(id) => format!("{}/{}", base, urlencoding::encode(id)),
            None => base,
        }
    }

    async fn timezone(&self) -> chrono_tz::Tz {
        self.config.read().await.tz()
    }

    async fn error_from_response(context: &str, response: reqwest::Response) -> crate::error::Error {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        google_calendar_error(&format!("{}: HTTP {} - {}", context, status, error_body))
    }

    /// List events in a time range, following pagination
    async fn list_events(&self, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> AppResult<Vec<CalendarEvent>> {
        let access_token = self.auth.valid_access_token().await?;
        let url = self.events_url(None).await;
        let tz = self.timezone().await;

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(&url)
                .query(&query)
                .bearer_auth(&access_token)
                .send()
                .await
                .map_err(|e| google_calendar_error(&format!("Failed to fetch events: {}", e)))?;

            if !response.status().is_success() {
                return Err(Self::error_from_response("Failed to fetch events", response).await);
            }

            let page: EventList = response
                .json()
                .await
                .map_err(|e| google_calendar_error(&format!("Failed to parse events response: {}", e)))?;

            events.extend(page.items.iter().filter_map(|event| from_google(event, tz)));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Fetched {} events from Google Calendar", events.len());
        Ok(events)
    }

    /// Create an event; the returned event carries the provider id
    async fn create_event(&self, event: CalendarEvent) -> AppResult<CalendarEvent> {
        let access_token = self.auth.valid_access_token().await?;
        let body = to_google(&CalendarEvent { google_event_id: None, ..event.clone() }, self.timezone().await)?;

        let response = self
            .client
            .post(self.events_url(None).await)
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to create event: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("Failed to create event", response).await);
        }

        let created: GoogleEvent = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse created event: {}", e)))?;

        info!("Created Google Calendar event '{}'", event.title);

        Ok(CalendarEvent {
            google_event_id: created.id,
            ..event
        })
    }

    /// Patch an event; `false` when the provider no longer has it
    async fn update_event(&self, google_id: &str, event: &CalendarEvent) -> AppResult<bool> {
        let access_token = self.auth.valid_access_token().await?;
        let mut body = to_google(event, self.timezone().await)?;
        body.id = None;

        let response = self
            .client
            .patch(self.events_url(Some(google_id)).await)
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to update event: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                info!("Updated Google Calendar event '{}'", event.title);
                Ok(true)
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                warn!("Google Calendar event {} not found for update", google_id);
                Ok(false)
            }
            _ => Err(Self::error_from_response("Failed to update event", response).await),
        }
    }

    /// Delete an event; `false` when it was already gone
    async fn delete_event(&self, google_id: &str) -> AppResult<bool> {
        let access_token = self.auth.valid_access_token().await?;

        let response = self
            .client
            .delete(self.events_url(Some(google_id)).await)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to delete event: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                info!("Deleted Google Calendar event {}", google_id);
                Ok(true)
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                debug!("Google Calendar event {} already deleted", google_id);
                Ok(false)
            }
            _ => Err(Self::error_from_response("Failed to delete event", response).await),
        }
    }

    /// Search the provider for the event a query refers to
    async fn find_matching(&self, query: &EventQuery) -> AppResult<Option<CalendarEvent>> {
        let (time_min, time_max) = match query.date.as_deref() {
            Some(date) => {
                let date = parse_date(date)
                    .ok_or_else(|| google_calendar_error(&format!("Invalid event date: {}", date)))?;
                let (start, end) = day_bounds(date, self.timezone().await)?;
                (start.with_timezone(&Utc), end.with_timezone(&Utc))
            }
            None => {
                let days = self.config.read().await.calendar_window_days;
                upcoming_window(Utc::now(), days)
            }
        };

        let events = self.list_events(time_min, time_max).await?;
        Ok(find_match(&events, query).cloned())
    }

    async fn resolve_google_id(&self, query: &EventQuery) -> AppResult<Option<String>> {
        if let Some(google_id) = &query.google_event_id {
            return Ok(Some(google_id.clone()));
        }

        Ok(self
            .find_matching(query)
            .await?
            .and_then(|event| event.google_event_id))
    }

    /// Update the event a query refers to; returns the provider id that was updated
    async fn update_matching(&self, query: &EventQuery, event: &CalendarEvent) -> AppResult<Option<String>> {
        let Some(google_id) = self.resolve_google_id(query).await? else {
            debug!("No Google Calendar event matches '{}'", query.title);
            return Ok(None);
        };

        if self.update_event(&google_id, event).await? {
            return Ok(Some(google_id));
        }

        // A stale provider id falls back to matching by title and date
        if query.google_event_id.is_some() {
            let fallback = EventQuery {
                google_event_id: None,
                ..query.clone()
            };
            if let Some(found) = self.find_matching(&fallback).await? {
                if let Some(found_id) = found.google_event_id {
                    if self.update_event(&found_id, event).await? {
                        return Ok(Some(found_id));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Delete the event a query refers to
    async fn delete_matching(&self, query: &EventQuery) -> AppResult<bool> {
        let Some(google_id) = self.resolve_google_id(query).await? else {
            debug!("No Google Calendar event matches '{}'", query.title);
            return Ok(false);
        };

        if self.delete_event(&google_id).await? {
            return Ok(true);
        }

        if query.google_event_id.is_some() {
            let fallback = EventQuery {
                google_event_id: None,
                ..query.clone()
            };
            if let Some(found) = self.find_matching(&fallback).await? {
                if let Some(found_id) = found.google_event_id {
                    return self.delete_event(&found_id).await;
                }
            }
        }

        Ok(false)
    }
}
