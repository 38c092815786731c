use super::models::Document;
use crate::error::{document_error, AppResult};
use std::path::Path;
use tracing::info;

/// Extensions read as plain text
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv", "json", "log"];

/// Load a text document from disk
pub async fn load_document(path: &Path) -> AppResult<Document> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !TEXT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(document_error(&format!(
            "Unsupported document type '{}'; supported: {}",
            extension,
            TEXT_EXTENSIONS.join(", ")
        )));
    }

    let bytes = tokio::fs::read(path).await?;
    let content = String::from_utf8(bytes)
        .map_err(|_| document_error(&format!("{} is not valid UTF-8 text", path.display())))?;

    if content.trim().is_empty() {
        return Err(document_error(&format!("{} is empty", path.display())));
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();

    info!("Loaded document {} ({} chars)", name, content.chars().count());
    Ok(Document::new(&name, content))
}

/// Leading part of a document, cut on a char boundary
pub fn document_excerpt(document: &Document, max_chars: usize) -> String {
    match document.content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n[...truncated]", &document.content[..cut]),
        None => document.content.clone(),
    }
}
