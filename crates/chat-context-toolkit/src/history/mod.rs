//! Conversation-history budgeting: turn windows, abbreviation, truncation,
//! and tool-call pairing.
//!
//! Every completion request has to fit the transcript into a token budget.
//! This module does that deterministically:
//!
//! 1. **[`turn`]**: [`TurnWindow`] reserves a token allotment for the most
//!    recent ("high-priority") messages and pins the high/low boundary for the
//!    whole agent turn, so repeated tool-call rounds don't shift it.
//!
//! 2. **[`pairing`]**: removes unanswered tool calls and orphaned tool
//!    results from the input before budgeting.
//!
//! 3. **[`engine`]**: [`BudgetEngine`] groups each tool call with its results,
//!    partitions the candidates, then abbreviates and drops low-priority
//!    messages oldest first, falling back to the high-priority set only when
//!    the high-priority set alone overflows. A call and its results are
//!    dropped together.
//!
//! 4. **[`token_counter`]** and **[`provider`]**: the two pluggable
//!    collaborators, i.e. how tokens are counted and where history comes from.
//!
//! 5. **[`abbreviation`]**: ready-made short renderings (tool-result
//!    placeholders, head/tail trimming) for building [`HistoryMessage`]s.
//!
//! 6. **[`budget`]**: [`HistoryBudget`] sizes the token budget and the
//!    high-priority allotment from a model's context window.

pub mod abbreviation;
pub mod budget;
pub mod engine;
pub mod message;
pub mod pairing;
pub mod provider;
pub mod token_counter;
pub mod turn;

// Re-export commonly used items at the module level.
pub use abbreviation::AbbreviationConfig;
pub use budget::{ContextUsage, HistoryBudget};
pub use engine::{BudgetEngine, BudgetReport, BudgetedEntry, BudgetedResult, apply_budget};
pub use message::{HistoryKind, HistoryMessage, Rendering};
pub use provider::{InMemoryProvider, MessageProvider, ProviderFuture};
pub use token_counter::{CharTokenCounter, DEFAULT_CHARS_PER_TOKEN, TokenCounter};
pub use turn::TurnWindow;

#[cfg(feature = "tiktoken")]
pub use token_counter::BpeTokenCounter;
