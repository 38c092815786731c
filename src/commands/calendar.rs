use super::util::{format_event, format_outcome};
use crate::assistant::Assistant;
use crate::components::chat::{CalendarAction, EventDraft};
use crate::error::{AppResult, Error};
use crate::utils::time::get_weekly_date_range;
use chrono::Utc;

/// List saved events from today on, marking this week's
pub async fn events(assistant: &Assistant) -> AppResult<String> {
    let today = Utc::now().with_timezone(&assistant.timezone()).date_naive();
    let today_str = today.format("%Y-%m-%d").to_string();
    let (_, week_end) = get_weekly_date_range(today);

    let events = assistant.events().await?;
    let upcoming: Vec<_> = events.iter().filter(|e| e.date >= today_str).collect();
    if upcoming.is_empty() {
        return Ok("No upcoming events.".to_string());
    }

    let (this_week, later): (Vec<_>, Vec<_>) =
        upcoming.into_iter().partition(|e| e.date <= week_end);

    let mut lines = Vec::new();
    if !this_week.is_empty() {
        lines.push("This week:".to_string());
        lines.extend(this_week.into_iter().map(|e| format!("  {}", format_event(e))));
    }
    if !later.is_empty() {
        lines.push("Later:".to_string());
        lines.extend(later.into_iter().map(|e| format!("  {}", format_event(e))));
    }

    Ok(lines.join("\n"))
}

/// Pull upcoming events from Google Calendar
pub async fn sync(assistant: &mut Assistant) -> AppResult<String> {
    match assistant.sync_calendar().await {
        Ok(count) => Ok(format!("Calendar synced, {} events saved.", count)),
        Err(Error::NotSignedIn) => {
            Ok("Not signed in to Google. Use /login first.".to_string())
        }
        Err(e) => Err(e),
    }
}

pub async fn add(
    assistant: &mut Assistant,
    date: String,
    time: Option<String>,
    title: String,
) -> AppResult<String> {
    let action = CalendarAction::AddEvent {
        event: EventDraft {
            title,
            date,
            time,
            end_time: None,
            description: None,
        },
    };

    let outcome = assistant.apply_action(action).await?;
    Ok(format_outcome(&outcome))
}

pub async fn delete(
    assistant: &mut Assistant,
    title: String,
    date: Option<String>,
) -> AppResult<String> {
    let outcome = assistant
        .apply_action(CalendarAction::DeleteEvent { title, date })
        .await?;
    Ok(format_outcome(&outcome))
}
