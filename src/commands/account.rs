use crate::assistant::Assistant;
use crate::components::google_auth::{run_local_consent, AuthClient, AuthState};
use crate::error::{component_error, AppResult};

fn auth(assistant: &Assistant) -> AppResult<&AuthClient> {
    assistant
        .auth()
        .ok_or_else(|| component_error("Google sign-in is not configured"))
}

/// Sign in through the browser, then pull the calendar
pub async fn login(assistant: &mut Assistant) -> AppResult<String> {
    let profile = run_local_consent(auth(assistant)?).await?;
    let mut text = format!("Signed in as {}.", profile.email);

    if assistant.settings().calendar_sync {
        match assistant.sync_calendar().await {
            Ok(count) => text.push_str(&format!(" Calendar synced, {} events saved.", count)),
            Err(e) => {
                tracing::warn!("Calendar sync after sign-in failed: {}", e);
                text.push_str(" Calendar sync failed; try /sync.");
            }
        }
    }

    Ok(text)
}

pub async fn whoami(assistant: &Assistant) -> AppResult<String> {
    Ok(match auth(assistant)?.state() {
        AuthState::SignedIn(profile) => match profile.name {
            Some(name) => format!("Signed in as {} <{}>.", name, profile.email),
            None => format!("Signed in as {}.", profile.email),
        },
        AuthState::SignedOut => "Not signed in.".to_string(),
    })
}

pub async fn logout(assistant: &Assistant) -> AppResult<String> {
    auth(assistant)?.sign_out().await?;
    Ok("Signed out of Google.".to_string())
}
