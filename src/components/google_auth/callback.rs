use super::client::AuthClient;
use super::models::{AuthFlow, UserProfile};
use crate::error::{google_auth_error, AppResult};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// How long to wait for the browser to come back
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Run the authorization code flow through the system browser.
///
/// Opens the consent page, waits for the redirect on the configured local
/// redirect URI and exchanges the code.
pub async fn run_local_consent(auth: &AuthClient) -> AppResult<UserProfile> {
    let redirect = Url::parse(&auth.redirect_uri().await)
        .map_err(|e| google_auth_error(&format!("Invalid redirect URI: {}", e)))?;
    let host = redirect.host_str().unwrap_or("localhost").to_string();
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| google_auth_error("Redirect URI has no port"))?;

    let request = auth.authorization_request(AuthFlow::Code).await?;

    // Bind before opening the browser so the redirect cannot arrive early
    let server = tiny_http::Server::http(format!("{}:{}", host, port))
        .map_err(|e| google_auth_error(&format!("Failed to listen on {}:{}: {}", host, port, e)))?;

    println!("Opening browser for Google authorization...");
    if let Err(e) = webbrowser::open(request.url.as_str()) {
        warn!("Could not open browser: {}", e);
        println!("Open this URL to continue:\n{}", request.url);
    }
    info!("Waiting for OAuth callback on {}:{}", host, port);

    let path = tokio::task::spawn_blocking(move || wait_for_callback(&server))
        .await
        .map_err(|e| google_auth_error(&format!("Callback listener failed: {}", e)))??;

    let mut callback = redirect.clone();
    callback.set_path("");
    let callback = callback
        .join(&path)
        .map_err(|e| google_auth_error(&format!("Invalid callback path: {}", e)))?;

    auth.handle_redirect(callback.as_str(), &request).await
}

/// Block until a request carrying `code` or `error` arrives; returns its path and query
fn wait_for_callback(server: &tiny_http::Server) -> AppResult<String> {
    loop {
        let request = server
            .recv_timeout(CALLBACK_TIMEOUT)
            .map_err(|e| google_auth_error(&format!("Failed to receive callback: {}", e)))?
            .ok_or_else(|| google_auth_error("Timed out waiting for authorization"))?;

        let path = request.url().to_string();
        if !(path.contains("code=") || path.contains("error=")) {
            // Browsers also ask for favicon.ico
            let _ = request.respond(tiny_http::Response::empty(404));
            continue;
        }

        let message = if path.contains("error=") {
            "Authorization was not completed. You can close this window."
        } else {
            "Authorization successful! You can close this window."
        };
        if let Err(e) = request.respond(tiny_http::Response::from_string(message)) {
            warn!("Failed to answer the browser: {}", e);
        }

        return Ok(path);
    }
}
