use serde::{Deserialize, Serialize};

/// Seconds before the stored expiry at which a token is already treated as expired
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the provider omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Persisted OAuth session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    /// Unix timestamp (seconds) after which the access token is invalid
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredToken {
    /// Build a stored token from a token endpoint response.
    ///
    /// Google usually omits the refresh token on refresh, so the previous one is kept.
    pub fn from_response(response: TokenResponse, now: i64, previous_refresh: Option<String>) -> Self {
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Self {
            access_token: response.access_token,
            expires_at: now + expires_in,
            refresh_token: response.refresh_token.or(previous_refresh),
            scope: response.scope,
        }
    }

    /// Whether the access token can still be used at `now`
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// Signed-in user's profile
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Sign-in state broadcast to listeners
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(UserProfile),
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }
}

/// OAuth flow used to obtain a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// Authorization code with PKCE; yields a refresh token
    Code,
    /// Implicit grant; the access token arrives in the redirect fragment
    Implicit,
}

/// A started authorization, kept until the redirect comes back
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub flow: AuthFlow,
    pub url: url::Url,
    pub state: String,
    pub code_verifier: Option<String>,
}
