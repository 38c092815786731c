use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(hovimestari::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(hovimestari::config))]
    Config(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(hovimestari::storage))]
    Storage(String),

    #[error("Google sign-in error: {0}")]
    #[diagnostic(code(hovimestari::google_auth))]
    GoogleAuth(String),

    #[error("Not signed in to Google")]
    #[diagnostic(
        code(hovimestari::not_signed_in),
        help("Run `get_calendar_token` or use /login to connect a Google account")
    )]
    NotSignedIn,

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(hovimestari::google_calendar))]
    GoogleCalendar(String),

    #[error("Chat error: {0}")]
    #[diagnostic(code(hovimestari::chat))]
    Chat(String),

    #[error("Instance error: {0}")]
    #[diagnostic(code(hovimestari::instance))]
    Instance(String),

    #[error("Document error: {0}")]
    #[diagnostic(code(hovimestari::document))]
    Document(String),

    #[error("{0}")]
    #[diagnostic(code(hovimestari::command), help("Type /help for the list of commands"))]
    Command(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(hovimestari::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(hovimestari::io))]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    #[diagnostic(code(hovimestari::http))]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(hovimestari::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(hovimestari::other))]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML serialization errors
impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create storage errors
pub fn storage_error(message: &str) -> Error {
    Error::Storage(message.to_string())
}

/// Helper to create Google sign-in errors
pub fn google_auth_error(message: &str) -> Error {
    Error::GoogleAuth(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create chat errors
pub fn chat_error(message: &str) -> Error {
    Error::Chat(message.to_string())
}

/// Helper to create instance errors
pub fn instance_error(message: &str) -> Error {
    Error::Instance(message.to_string())
}

/// Helper to create document errors
pub fn document_error(message: &str) -> Error {
    Error::Document(message.to_string())
}

/// Helper to create command usage errors
pub fn command_error(message: &str) -> Error {
    Error::Command(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
