//! JSON transcript loading.
//!
//! A transcript is a JSON array of API-shaped messages, each optionally
//! carrying a stable `id` and a precomputed `abbreviated` rendering:
//!
//! ```json
//! [
//!   {"id": "m1", "role": "user", "content": "List the crates."},
//!   {"role": "assistant", "tool_calls": [{"id": "c1", "type": "function",
//!     "function": {"name": "ls", "arguments": "{\"path\":\"crates\"}"}}]},
//!   {"role": "tool", "tool_call_id": "c1", "content": "...",
//!    "abbreviated": {"role": "tool", "tool_call_id": "c1", "content": "[Cleared]"}}
//! ]
//! ```
//!
//! Entries without an id get `msg-<index>` (zero-based position).

use crate::history::HistoryMessage;
use crate::{HistoryError, Message};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize)]
struct TranscriptEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    message: Message,
    #[serde(default)]
    abbreviated: Option<Message>,
}

/// Parse a transcript from a JSON string.
pub fn parse_transcript(json: &str) -> Result<Vec<HistoryMessage>, HistoryError> {
    let entries: Vec<TranscriptEntry> = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    let mut messages = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let id = entry.id.unwrap_or_else(|| format!("msg-{index}"));
        if !seen.insert(id.clone()) {
            return Err(HistoryError::Transcript(format!(
                "duplicate message id '{id}' at index {index}"
            )));
        }
        let mut message = HistoryMessage::new(id, entry.message);
        if let Some(abbreviated) = entry.abbreviated {
            message = message.with_abbreviation(abbreviated);
        }
        messages.push(message);
    }

    Ok(messages)
}

/// Read and parse a transcript file.
pub fn load_transcript(path: &Path) -> Result<Vec<HistoryMessage>, HistoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let messages = parse_transcript(&content)?;
    debug!(
        "transcript: loaded {} messages from {}",
        messages.len(),
        path.display()
    );
    Ok(messages)
}
