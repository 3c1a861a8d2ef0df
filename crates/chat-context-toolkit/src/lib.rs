//! Token budgeting for LLM conversation history.
//!
//! `chat-context-toolkit` fits a chat transcript into a fixed token budget
//! before it is sent to an OpenAI-style chat completions endpoint. Recent
//! ("high-priority") messages are kept at full fidelity, older messages are
//! abbreviated and then dropped oldest first, and tool calls stay paired
//! with their tool results.
//!
//! The core entry point is [`apply_budget`](history::apply_budget). It takes
//! a [`TurnWindow`](history::TurnWindow) that stays pinned for one logical
//! agent turn, a token budget, a pluggable
//! [`TokenCounter`](history::TokenCounter), and a
//! [`MessageProvider`](history::MessageProvider) that materializes the
//! current history.
//!
//! # Getting started
//!
//! ```ignore
//! use chat_context_toolkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), HistoryError> {
//!     let provider = InMemoryProvider::new(vec![
//!         HistoryMessage::new("m1", Message::user("Summarize the design doc.")),
//!         HistoryMessage::new("m2", Message::assistant_text("Here is the summary...")),
//!         HistoryMessage::new("m3", Message::user("Now list the open questions.")),
//!     ]);
//!
//!     let budget = HistoryBudget::default().with_max_tokens(128_000);
//!     let mut turn = budget.new_turn();
//!
//!     // Call once per completion round; reuse `turn` for the whole turn.
//!     let result = apply_budget(
//!         &mut turn,
//!         budget.effective_max_tokens(),
//!         &CharTokenCounter::default(),
//!         &provider,
//!     )
//!     .await?;
//!
//!     println!("{} messages, {}", result.messages.len(), result.report.to_log_string());
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **Describe a history message:** [`HistoryMessage`](history::HistoryMessage)
//!   wraps an API-shaped [`Message`] with a stable id and an optional
//!   abbreviated rendering. Ready-made abbreviations live in
//!   [`history::abbreviation`].
//!
//! - **Count tokens:** implement [`TokenCounter`](history::TokenCounter), pass
//!   a closure, or use [`CharTokenCounter`](history::CharTokenCounter). Enable
//!   the `tiktoken` feature for a BPE-backed counter.
//!
//! - **Supply history:** implement [`MessageProvider`](history::MessageProvider)
//!   over your conversation store, or use
//!   [`InMemoryProvider`](history::InMemoryProvider).
//!
//! - **Size the budget:** [`HistoryBudget`](history::HistoryBudget) derives the
//!   history token budget and the high-priority allotment from a model's
//!   context window and reserves.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`history`] | Turn windows, budget engine, tool-call pairing, abbreviation, token counting |
//! | [`transcript`] | JSON transcript loading (used by the `cctk` CLI) |
//! | [`error`] | [`HistoryError`] |
//! | [`prelude`] | Glob-importable re-exports |

pub mod error;
pub mod history;
pub mod prelude;
pub mod transcript;

use serde::{Deserialize, Serialize};

pub use error::HistoryError;

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// An API-shaped message, as sent to a chat completions endpoint.
///
/// This is the "rendering" of a history message: both the full and the
/// abbreviated forms of a [`HistoryMessage`](history::HistoryMessage) are
/// `Message` values.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Ids of the tool calls requested by this message (empty unless it is
    /// an assistant message with tool calls).
    pub fn tool_call_ids(&self) -> Vec<&str> {
        self.tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Number of characters in the rendered message: content plus tool-call
    /// names and arguments.
    pub fn rendered_chars(&self) -> usize {
        let content = self.content.as_deref().map_or(0, |c| c.chars().count());
        let calls: usize = self
            .tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| c.function.name.chars().count() + c.function.arguments.chars().count())
            .sum();
        content + calls
    }
}

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A tool call requested by the model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

impl ToolCall {
    /// Create a function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}
