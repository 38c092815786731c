use crate::error::{config_error, env_error, AppResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;

/// Default Gemini model for chat
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// File holding component toggles
const COMPONENTS_FILE: &str = "config/components.toml";

/// Which key-value backend holds the application data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Redis,
    Memory,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(config_error(&format!("Unknown storage backend: {}", other))),
        }
    }
}

/// Base URLs of the remote APIs, overridable for tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_revoke_url: String,
    pub google_userinfo_url: String,
    pub google_calendar_api: String,
    pub gemini_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            google_auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            google_userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            google_calendar_api: "https://www.googleapis.com/calendar/v3".to_string(),
            gemini_api: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// Main configuration structure for the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key
    pub gemini_api_key: String,
    /// Default Gemini model used by new instances
    pub gemini_model: String,
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Google Calendar ID to sync with
    pub google_calendar_id: String,
    /// OAuth redirect URI registered for the client
    pub google_redirect_uri: String,
    /// Redis connection URL
    pub redis_url: String,
    /// Storage backend for instance data
    pub storage_backend: StorageBackendKind,
    /// Timezone for calendar events
    pub timezone: String,
    /// How many days ahead calendar sync looks
    pub calendar_window_days: i64,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Remote API base URLs
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_calendar_id: "primary".to_string(),
            google_redirect_uri: "http://localhost:8080".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            storage_backend: StorageBackendKind::Redis,
            timezone: "UTC".to_string(),
            calendar_window_days: 30,
            components: default_components(),
            endpoints: Endpoints::default(),
        }
    }
}

fn default_components() -> HashMap<String, bool> {
    let mut components = HashMap::new();
    components.insert("google_calendar".to_string(), true);
    components.insert("search_grounding".to_string(), true);
    components
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let gemini_api_key = env::var("GEMINI_API_KEY").map_err(|_| env_error("GEMINI_API_KEY"))?;

        let defaults = Config::default();

        let gemini_model = env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model);
        let google_client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let google_calendar_id =
            env::var("GOOGLE_CALENDAR_ID").unwrap_or(defaults.google_calendar_id);
        let google_redirect_uri =
            env::var("GOOGLE_REDIRECT_URI").unwrap_or(defaults.google_redirect_uri);
        let redis_url = env::var("REDIS_URL").unwrap_or(defaults.redis_url);

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.storage_backend,
        };

        let timezone = env::var("TIMEZONE").unwrap_or(defaults.timezone);
        if timezone.parse::<Tz>().is_err() {
            return Err(config_error(&format!("Invalid TIMEZONE: {}", timezone)));
        }

        let calendar_window_days = match env::var("CALENDAR_WINDOW_DAYS") {
            Ok(value) => value
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| env_error("Invalid CALENDAR_WINDOW_DAYS format"))?,
            Err(_) => defaults.calendar_window_days,
        };

        let mut components = default_components();

        // Load components configuration from file if it exists
        if let Ok(content) = fs::read_to_string(COMPONENTS_FILE) {
            if let Ok(file_components) = toml::from_str::<HashMap<String, bool>>(&content) {
                // Merge with defaults
                for (key, value) in file_components {
                    components.insert(key, value);
                }
            }
        }

        Ok(Config {
            gemini_api_key,
            gemini_model,
            google_client_id,
            google_client_secret,
            google_calendar_id,
            google_redirect_uri,
            redis_url,
            storage_backend,
            timezone,
            calendar_window_days,
            components,
            endpoints: Endpoints::default(),
        })
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }

    /// Whether Google OAuth client credentials are present
    pub fn has_google_credentials(&self) -> bool {
        !self.google_client_id.is_empty()
    }

    /// Parsed timezone, falling back to UTC
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("redis".parse::<StorageBackendKind>().unwrap(), StorageBackendKind::Redis);
        assert_eq!(" Memory ".parse::<StorageBackendKind>().unwrap(), StorageBackendKind::Memory);
        assert!("sqlite".parse::<StorageBackendKind>().is_err());
    }

    #[test]
    fn test_component_toggles() {
        let mut config = Config::default();
        assert!(config.is_component_enabled("google_calendar"));
        assert!(!config.is_component_enabled("unknown"));

        config.components.insert("search_grounding".to_string(), false);
        assert!(!config.is_component_enabled("search_grounding"));
    }

    #[test]
    fn test_timezone_fallback() {
        let mut config = Config::default();
        config.timezone = "Europe/Helsinki".to_string();
        assert_eq!(config.tz(), chrono_tz::Europe::Helsinki);

        config.timezone = "Not/AZone".to_string();
        assert_eq!(config.tz(), Tz::UTC);
    }
}
