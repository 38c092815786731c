//! Memory, documents and settings of the open instance.

use super::util::format_settings;
use crate::assistant::Assistant;
use crate::components::instances::MemoryField;
use crate::error::AppResult;
use std::path::Path;

pub async fn memory(assistant: &Assistant) -> AppResult<String> {
    let memory = assistant.memory().await?;
    if memory.is_empty() {
        return Ok("Nothing remembered yet.".to_string());
    }

    let section = |heading: &str, text: &str| {
        let text = text.trim();
        format!("{}:\n{}", heading, if text.is_empty() { "(empty)" } else { text })
    };

    Ok([
        section("Information", &memory.information),
        section("Standing requests", &memory.permanent_requests),
        section("Requests for now", &memory.temporary_requests),
    ]
    .join("\n\n"))
}

pub async fn remember_information(assistant: &mut Assistant, text: &str) -> AppResult<String> {
    assistant.remember(MemoryField::Information, text).await?;
    Ok("Noted.".to_string())
}

pub async fn remember_request(assistant: &mut Assistant, text: &str) -> AppResult<String> {
    assistant.remember(MemoryField::PermanentRequests, text).await?;
    Ok("Standing request saved.".to_string())
}

pub async fn remember_temporary(assistant: &mut Assistant, text: &str) -> AppResult<String> {
    assistant.remember(MemoryField::TemporaryRequests, text).await?;
    Ok("Request saved until /forget-temp.".to_string())
}

pub async fn forget_temporary(assistant: &mut Assistant) -> AppResult<String> {
    assistant.forget_temporary().await?;
    Ok("Temporary requests cleared.".to_string())
}

pub async fn documents(assistant: &Assistant) -> AppResult<String> {
    let documents = assistant.documents().await?;
    if documents.is_empty() {
        return Ok("No documents.".to_string());
    }

    Ok(documents
        .iter()
        .map(|d| {
            format!(
                "{}  ({} chars, added {})",
                d.name,
                d.content.chars().count(),
                d.added_at.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

pub async fn add_document(assistant: &mut Assistant, path: &Path) -> AppResult<String> {
    let document = assistant.add_document(path).await?;
    Ok(format!("Added document {}.", document.name))
}

pub async fn remove_document(assistant: &mut Assistant, name: &str) -> AppResult<String> {
    if assistant.remove_document(name).await? {
        Ok(format!("Removed document {}.", name))
    } else {
        Ok(format!("No document named {}.", name))
    }
}

pub fn settings(assistant: &Assistant) -> String {
    format_settings(assistant.settings())
}

pub async fn set(assistant: &mut Assistant, key: &str, value: &str) -> AppResult<String> {
    let reinitialized = assistant.update_setting(key, value).await?;
    Ok(if reinitialized {
        format!("{} updated; chat session re-initialized.", key)
    } else {
        format!("{} updated.", key)
    })
}
