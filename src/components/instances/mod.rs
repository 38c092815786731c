//! Named, PIN-protected assistant profiles and everything persisted per profile.

pub mod documents;
pub mod models;
mod pin;
mod store;

pub use models::{
    ChatMessage, ChatRole, Document, InstanceRecord, InstanceSettings, MemoryField, MemoryStore,
};
pub use pin::validate_pin;
pub use store::{Instance, InstanceRegistry, MAX_CHAT_HISTORY};
