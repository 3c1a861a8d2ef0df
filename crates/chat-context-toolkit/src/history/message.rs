//! History messages: a stable id, a full rendering, and an optional
//! abbreviated rendering.

use crate::history::abbreviation::{self, AbbreviationConfig};
use crate::{Message, MessageRole};

/// Which rendering of a [`HistoryMessage`] ends up in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    Full,
    Abbreviated,
}

/// The kind of a history message, as far as tool-call pairing is concerned.
///
/// Only assistant messages carry tool-call ids, and only tool results carry
/// the id of the call they answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryKind {
    System,
    User,
    /// An assistant message. `tool_call_ids` is empty for plain text replies.
    Assistant { tool_call_ids: Vec<String> },
    /// The result of the tool call with id `tool_call_id`.
    ToolResult { tool_call_id: String },
}

impl HistoryKind {
    /// Classify an API-shaped message.
    pub fn of(message: &Message) -> Self {
        match message.role {
            MessageRole::System => HistoryKind::System,
            MessageRole::User => HistoryKind::User,
            MessageRole::Assistant => HistoryKind::Assistant {
                tool_call_ids: message
                    .tool_call_ids()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            },
            MessageRole::Tool => HistoryKind::ToolResult {
                tool_call_id: message.tool_call_id.clone().unwrap_or_default(),
            },
        }
    }

    /// Tool calls requested by this message (assistant messages only).
    pub fn tool_call_ids(&self) -> &[String] {
        match self {
            HistoryKind::Assistant { tool_call_ids } => tool_call_ids,
            _ => &[],
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_call_ids().is_empty()
    }
}

/// One message of conversation history, as seen by the budget engine.
///
/// The abbreviated rendering is optional; without one, the full rendering is
/// used in its place. An abbreviated rendering should keep the tool-call
/// linkage of the full one (same `tool_calls` ids or `tool_call_id`), and
/// should never cost more tokens than the full rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryMessage {
    id: String,
    kind: HistoryKind,
    full: Message,
    abbreviated: Option<Message>,
}

impl HistoryMessage {
    /// Create a history message without an abbreviated rendering.
    pub fn new(id: impl Into<String>, full: Message) -> Self {
        Self {
            id: id.into(),
            kind: HistoryKind::of(&full),
            full,
            abbreviated: None,
        }
    }

    /// Attach an abbreviated rendering.
    pub fn with_abbreviation(mut self, abbreviated: Message) -> Self {
        self.abbreviated = Some(abbreviated);
        self
    }

    /// Attach the crate's default abbreviation (see
    /// [`abbreviation::default_abbreviation`]) unless one is already set.
    pub fn with_default_abbreviation(mut self, config: &AbbreviationConfig) -> Self {
        if self.abbreviated.is_none() {
            self.abbreviated = abbreviation::default_abbreviation(&self.full, config);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &HistoryKind {
        &self.kind
    }

    pub fn full(&self) -> &Message {
        &self.full
    }

    /// The abbreviated rendering, or the full one if none is defined.
    pub fn abbreviated(&self) -> &Message {
        self.abbreviated.as_ref().unwrap_or(&self.full)
    }

    pub fn has_abbreviation(&self) -> bool {
        self.abbreviated.is_some()
    }

    pub fn rendering(&self, rendering: Rendering) -> &Message {
        match rendering {
            Rendering::Full => &self.full,
            Rendering::Abbreviated => self.abbreviated(),
        }
    }
}
