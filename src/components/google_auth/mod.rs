//! Google account sign-in: OAuth flows, the persisted session token and
//! sign-in state notifications.

mod callback;
mod client;
pub mod models;
pub mod token;

pub use callback::run_local_consent;
pub use client::{code_challenge, AuthClient, SCOPES};
pub use models::{AuthFlow, AuthState, AuthorizationRequest, StoredToken, UserProfile};
pub use token::TokenStore;
