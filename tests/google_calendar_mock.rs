mod common;

use chrono::{Duration, Utc};
use hovimestari::components::google_calendar::{CalendarEvent, EventQuery, GoogleCalendarHandle};
use hovimestari::error::Error;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

async fn calendar(server: &MockServer) -> GoogleCalendarHandle {
    let config = common::shared(common::test_config(&server.uri()));
    let auth = common::signed_in_auth(config.clone(), common::memory_storage()).await;
    GoogleCalendarHandle::new(config, auth)
}

fn dentist_page() -> serde_json::Value {
    json!({
        "items": [
            {
                "id": "g-dentist",
                "summary": "Dentist",
                "start": { "dateTime": "2025-05-02T09:00:00+03:00" },
                "end": { "dateTime": "2025-05-02T10:00:00+03:00" }
            },
            {
                "id": "g-cancelled",
                "summary": "Cancelled thing",
                "status": "cancelled",
                "start": { "date": "2025-05-02" }
            }
        ]
    })
}

#[tokio::test]
async fn test_list_events_follows_pages_and_converts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(|request: &wiremock::Request| -> ResponseTemplate {
            let second_page = request.url.query_pairs().any(|(key, _)| key == "pageToken");
            if second_page {
                ResponseTemplate::new(200).set_body_json(json!({
                    "items": [{
                        "id": "g-midsummer",
                        "summary": "Midsummer",
                        "start": { "date": "2025-06-20" },
                        "end": { "date": "2025-06-21" }
                    }]
                }))
            } else {
                let mut page = dentist_page();
                page["nextPageToken"] = json!("page-2");
                ResponseTemplate::new(200).set_body_json(page)
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    let calendar = calendar(&server).await;
    let now = Utc::now();
    let events = calendar.list_events(now, now + Duration::days(30)).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].title, "Dentist");
    assert_eq!(events[0].date, "2025-05-02");
    assert_eq!(events[0].time.as_deref(), Some("09:00"));
    assert_eq!(events[0].end_time.as_deref(), Some("10:00"));
    assert_eq!(events[0].google_event_id.as_deref(), Some("g-dentist"));
    assert!(events[1].is_all_day());
}

#[tokio::test]
async fn test_create_event_returns_provider_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(body_string_contains("\"summary\":\"Sauna\""))
        .and(body_string_contains("\"timeZone\":\"Europe/Helsinki\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "g-sauna",
            "summary": "Sauna"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let calendar = calendar(&server).await;
    let event = CalendarEvent::new("Sauna", "2025-05-02", Some("18:00"));
    let local_id = event.id.clone();

    let created = calendar.create_event(event).await.unwrap();
    assert_eq!(created.google_event_id.as_deref(), Some("g-sauna"));
    assert_eq!(created.id, local_id);
}

#[tokio::test]
async fn test_delete_missing_event_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/g-gone", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/g-broken", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let calendar = calendar(&server).await;
    assert!(!calendar.delete_event("g-gone").await.unwrap());
    assert!(matches!(
        calendar.delete_event("g-broken").await,
        Err(Error::GoogleCalendar(_))
    ));
}

#[tokio::test]
async fn test_matching_by_title_and_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(dentist_page()))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/g-dentist", EVENTS_PATH)))
        .and(body_string_contains("Dentist (moved)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "g-dentist" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/g-dentist", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let calendar = calendar(&server).await;

    let found = calendar
        .find_matching(EventQuery::new("  DENTIST ", Some("2025-05-02")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.google_event_id.as_deref(), Some("g-dentist"));

    assert!(calendar
        .find_matching(EventQuery::new("Dentist appointment", Some("2025-05-02")))
        .await
        .unwrap()
        .is_none());

    let moved = CalendarEvent::new("Dentist (moved)", "2025-05-02", Some("11:00"));
    assert_eq!(
        calendar
            .update_matching(EventQuery::new("dentist", Some("2025-05-02")), moved)
            .await
            .unwrap()
            .as_deref(),
        Some("g-dentist")
    );

    assert!(!calendar
        .delete_matching(EventQuery::new("Gym", Some("2025-05-02")))
        .await
        .unwrap());
    assert!(calendar
        .delete_matching(EventQuery::new("Dentist", Some("2025-05-02")))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_stale_provider_id_falls_back_to_matching() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/g-stale", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(dentist_page()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/g-dentist", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let calendar = calendar(&server).await;
    let query = EventQuery::new("Dentist", Some("2025-05-02"))
        .with_google_id(Some("g-stale".to_string()));

    assert!(calendar.delete_matching(query).await.unwrap());
}

#[tokio::test]
async fn test_signed_out_calendar_reports_not_signed_in() {
    let server = MockServer::start().await;
    let config = common::shared(common::test_config(&server.uri()));
    let auth = hovimestari::components::google_auth::AuthClient::new(
        config.clone(),
        common::memory_storage(),
    );
    let calendar = GoogleCalendarHandle::new(config, auth);

    assert!(matches!(
        calendar.upcoming_events(7).await,
        Err(Error::NotSignedIn)
    ));
    calendar.shutdown().await.unwrap();
}
