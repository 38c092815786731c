use super::models::{
    AuthFlow, AuthState, AuthorizationRequest, StoredToken, TokenResponse, UserProfile,
};
use super::token::TokenStore;
use crate::components::storage::StorageHandle;
use crate::config::Config;
use crate::error::{google_auth_error, AppResult, Error};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};
use url::Url;

/// Scopes needed for calendar access and the account profile
pub const SCOPES: &[&str] = &[
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/calendar.events",
];

const PKCE_VERIFIER_LEN: usize = 64;

/// Google OAuth client: obtains, refreshes and revokes the session token
#[derive(Clone)]
pub struct AuthClient {
    config: Arc<RwLock<Config>>,
    tokens: TokenStore,
    client: Client,
    state_tx: Arc<watch::Sender<AuthState>>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("state", &*self.state_tx.borrow())
            .finish()
    }
}

impl AuthClient {
    pub fn new(config: Arc<RwLock<Config>>, storage: StorageHandle) -> Self {
        let (state_tx, _) = watch::channel(AuthState::SignedOut);
        Self {
            config,
            tokens: TokenStore::new(storage),
            client: Client::new(),
            state_tx: Arc::new(state_tx),
        }
    }

    /// Token store backing this client
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Listen for sign-in state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Current sign-in state
    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Redirect URI registered for this client
    pub async fn redirect_uri(&self) -> String {
        self.config.read().await.google_redirect_uri.clone()
    }

    fn publish(&self, state: AuthState) {
        self.state_tx.send_replace(state);
    }

    /// Build the consent URL for the given flow
    pub async fn authorization_request(&self, flow: AuthFlow) -> AppResult<AuthorizationRequest> {
        let config = self.config.read().await;
        if !config.has_google_credentials() {
            return Err(google_auth_error("GOOGLE_CLIENT_ID is not configured"));
        }

        let mut url = Url::parse(&config.endpoints.google_auth_url)
            .map_err(|e| google_auth_error(&format!("Failed to parse auth URL: {}", e)))?;

        let state = uuid::Uuid::new_v4().to_string();
        let scope = SCOPES.join(" ");

        let code_verifier = match flow {
            AuthFlow::Code => Some(generate_code_verifier()),
            AuthFlow::Implicit => None,
        };

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &config.google_client_id)
                .append_pair("redirect_uri", &config.google_redirect_uri)
                .append_pair("scope", &scope)
                .append_pair("state", &state);

            match (&flow, &code_verifier) {
                (AuthFlow::Code, Some(verifier)) => {
                    query
                        .append_pair("response_type", "code")
                        .append_pair("access_type", "offline")
                        .append_pair("prompt", "consent")
                        .append_pair("code_challenge", &code_challenge(verifier))
                        .append_pair("code_challenge_method", "S256");
                }
                _ => {
                    query
                        .append_pair("response_type", "token")
                        .append_pair("include_granted_scopes", "true");
                }
            }
        }

        Ok(AuthorizationRequest {
            flow,
            url,
            state,
            code_verifier,
        })
    }

    /// Finish an authorization from the URL the provider redirected to
    pub async fn handle_redirect(
        &self,
        redirect_url: &str,
        request: &AuthorizationRequest,
    ) -> AppResult<UserProfile> {
        let url = Url::parse(redirect_url)
            .map_err(|e| google_auth_error(&format!("Invalid redirect URL: {}", e)))?;

        let params: HashMap<String, String> = match request.flow {
            AuthFlow::Code => url.query_pairs().into_owned().collect(),
            AuthFlow::Implicit => url::form_urlencoded::parse(url.fragment().unwrap_or("").as_bytes())
                .into_owned()
                .collect(),
        };

        if let Some(error) = params.get("error") {
            return Err(google_auth_error(&format!("Authorization denied: {}", error)));
        }

        if params.get("state") != Some(&request.state) {
            return Err(google_auth_error("State mismatch in OAuth redirect"));
        }

        match request.flow {
            AuthFlow::Code => {
                let code = params
                    .get("code")
                    .ok_or_else(|| google_auth_error("No authorization code in redirect"))?;
                self.exchange_code(code, request.code_verifier.as_deref()).await
            }
            AuthFlow::Implicit => self.complete_implicit(&params).await,
        }
    }

    /// Exchange an authorization code for tokens and sign in
    pub async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> AppResult<UserProfile> {
        let (token_url, mut form) = {
            let config = self.config.read().await;
            let form = vec![
                ("client_id", config.google_client_id.clone()),
                ("client_secret", config.google_client_secret.clone()),
                ("code", code.to_string()),
                ("redirect_uri", config.google_redirect_uri.clone()),
                ("grant_type", "authorization_code".to_string()),
            ];
            (config.endpoints.google_token_url.clone(), form)
        };

        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier.to_string()));
        }

        let response = self.post_token_request(&token_url, &form).await?;
        let token = StoredToken::from_response(response, Utc::now().timestamp(), None);
        self.tokens.set(&token).await?;
        info!("Google authorization code exchanged");

        self.sign_in_with(&token).await
    }

    async fn complete_implicit(&self, params: &HashMap<String, String>) -> AppResult<UserProfile> {
        let access_token = params
            .get("access_token")
            .ok_or_else(|| google_auth_error("No access token in redirect"))?;

        let expires_in = params.get("expires_in").and_then(|v| v.parse::<i64>().ok());

        let response = TokenResponse {
            access_token: access_token.clone(),
            expires_in,
            refresh_token: None,
            scope: params.get("scope").cloned(),
        };

        let token = StoredToken::from_response(response, Utc::now().timestamp(), None);
        self.tokens.set(&token).await?;

        self.sign_in_with(&token).await
    }

    async fn sign_in_with(&self, token: &StoredToken) -> AppResult<UserProfile> {
        let profile = self.fetch_profile_with(&token.access_token).await?;
        info!("Signed in to Google as {}", profile.email);
        self.publish(AuthState::SignedIn(profile.clone()));
        Ok(profile)
    }

    /// A usable access token, refreshing it when expired
    pub async fn valid_access_token(&self) -> AppResult<String> {
        if let Some(token) = self.tokens.get().await? {
            return Ok(token.access_token);
        }

        if self.tokens.refresh_token().await?.is_some() {
            let token = self.refresh().await?;
            return Ok(token.access_token);
        }

        Err(Error::NotSignedIn)
    }

    /// Refresh the access token using the stored refresh token
    pub async fn refresh(&self) -> AppResult<StoredToken> {
        let refresh_token = self
            .tokens
            .refresh_token()
            .await?
            .ok_or_else(|| google_auth_error("No refresh token in token data"))?;

        let (token_url, form) = {
            let config = self.config.read().await;
            let form = vec![
                ("client_id", config.google_client_id.clone()),
                ("client_secret", config.google_client_secret.clone()),
                ("refresh_token", refresh_token.clone()),
                ("grant_type", "refresh_token".to_string()),
            ];
            (config.endpoints.google_token_url.clone(), form)
        };

        let response = self.post_token_request(&token_url, &form).await?;
        let token = StoredToken::from_response(response, Utc::now().timestamp(), Some(refresh_token));
        self.tokens.set(&token).await?;
        info!("Google access token refreshed");

        Ok(token)
    }

    async fn post_token_request(
        &self,
        token_url: &str,
        form: &[(&str, String)],
    ) -> AppResult<TokenResponse> {
        // Empty secrets are omitted for public clients
        let form: Vec<(&str, &str)> = form
            .iter()
            .filter(|(key, value)| !(*key == "client_secret" && value.is_empty()))
            .map(|(key, value)| (*key, value.as_str()))
            .collect();

        let response = self
            .client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| google_auth_error(&format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_auth_error(&format!(
                "Token request failed: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| google_auth_error(&format!("Failed to parse token response: {}", e)))
    }

    /// Fetch the signed-in user's profile
    pub async fn fetch_profile(&self) -> AppResult<UserProfile> {
        let access_token = self.valid_access_token().await?;
        self.fetch_profile_with(&access_token).await
    }

    async fn fetch_profile_with(&self, access_token: &str) -> AppResult<UserProfile> {
        let userinfo_url = self.config.read().await.endpoints.google_userinfo_url.clone();

        let response = self
            .client
            .get(&userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| google_auth_error(&format!("Failed to fetch profile: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(google_auth_error(&format!(
                "Failed to fetch profile: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json::<UserProfile>()
            .await
            .map_err(|e| google_auth_error(&format!("Failed to parse profile: {}", e)))
    }

    /// Re-derive the sign-in state from a previously stored token
    pub async fn restore(&self) -> AuthState {
        let state = match self.fetch_profile().await {
            Ok(profile) => {
                info!("Restored Google session for {}", profile.email);
                AuthState::SignedIn(profile)
            }
            Err(Error::NotSignedIn) => AuthState::SignedOut,
            Err(e) => {
                warn!("Could not restore Google session: {}", e);
                AuthState::SignedOut
            }
        };

        self.publish(state.clone());
        state
    }

    /// Revoke and forget the session token
    pub async fn sign_out(&self) -> AppResult<()> {
        if let Some(token) = self.tokens.get_raw().await? {
            let revoke_url = self.config.read().await.endpoints.google_revoke_url.clone();
            let revoke_token = token.refresh_token.unwrap_or(token.access_token);

            match self
                .client
                .post(&revoke_url)
                .form(&[("token", revoke_token.as_str())])
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => info!("Google token revoked"),
                Ok(response) => warn!("Token revocation returned HTTP {}", response.status()),
                Err(e) => warn!("Token revocation failed: {}", e),
            }
        }

        self.tokens.clear().await?;
        self.publish(AuthState::SignedOut);
        info!("Signed out of Google");
        Ok(())
    }
}

/// Random PKCE code verifier
fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PKCE_VERIFIER_LEN)
        .map(char::from)
        .collect()
}

/// S256 code challenge for a verifier
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
