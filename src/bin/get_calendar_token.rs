use hovimestari::components::google_auth::{run_local_consent, AuthClient};
use hovimestari::components::storage::start_storage;
use hovimestari::config::Config;
use hovimestari::error::{config_error, AppResult};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load()?;
    if !config.has_google_credentials() {
        return Err(config_error("GOOGLE_CLIENT_ID must be set to authorize Google Calendar"));
    }

    // Token goes to the same store the assistant reads
    let storage = start_storage(&config)?;
    let config = Arc::new(RwLock::new(config));
    let auth = AuthClient::new(config, storage.clone());

    let profile = run_local_consent(&auth).await?;

    let token = auth.tokens().get_raw().await?;
    let has_refresh = token.and_then(|t| t.refresh_token).is_some();

    println!("Signed in as {}.", profile.email);
    if has_refresh {
        println!("Token with refresh access saved.");
    } else {
        println!("Token saved without a refresh token; run this again when it expires.");
    }

    storage.shutdown().await?;
    Ok(())
}
