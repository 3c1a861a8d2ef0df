//! Convenience re-exports for common `chat-context-toolkit` types.
//!
//! Meant to be glob-imported:
//!
//! ```ignore
//! use chat_context_toolkit::prelude::*;
//! ```
//!
//! Covers message construction, the budgeting entry point, token counters,
//! and providers. Pairing repair and abbreviation helpers live in their
//! modules under [`history`](crate::history).

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{HistoryError, Message, MessageRole, ToolCall};

// ── Budgeting ───────────────────────────────────────────────────────
pub use crate::history::{
    BudgetEngine, BudgetReport, BudgetedResult, ContextUsage, HistoryBudget, TurnWindow,
    apply_budget,
};

// ── History messages ────────────────────────────────────────────────
pub use crate::history::{AbbreviationConfig, HistoryKind, HistoryMessage, Rendering};

// ── Token counting ──────────────────────────────────────────────────
pub use crate::history::{CharTokenCounter, TokenCounter};

// ── Providers ───────────────────────────────────────────────────────
pub use crate::history::{InMemoryProvider, MessageProvider, ProviderFuture};

// ── Transcripts ─────────────────────────────────────────────────────
pub use crate::transcript::{load_transcript, parse_transcript};
