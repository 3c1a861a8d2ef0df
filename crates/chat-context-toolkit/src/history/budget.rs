//! History budget sizing: derives the token budget handed to
//! [`apply_budget`](super::apply_budget) and the high-priority allotment of
//! each [`TurnWindow`] from a model's context window.
//!
//! The history only gets what is left of the context window after the
//! model's response and any fixed prompt overhead (system prompt, tool
//! definitions) are reserved. A share of that is set aside for the most
//! recent messages of each turn.

use crate::history::token_counter::TokenCounter;
use crate::history::turn::TurnWindow;
use crate::{HistoryError, Message};
use serde::Deserialize;
use std::path::Path;

/// Default context window size in tokens.
const DEFAULT_CONTEXT_WINDOW: usize = 200_000;

/// Default share of the effective budget reserved for recent messages.
const DEFAULT_HIGH_PRIORITY_FRACTION: f64 = 0.30;

/// Token budget configuration for conversation history.
///
/// # Example
///
/// ```
/// use chat_context_toolkit::history::HistoryBudget;
///
/// let budget = HistoryBudget::default()
///     .with_max_tokens(128_000)
///     .with_output_reserve(4_096)
///     .with_system_reserve(2_000)
///     .with_high_priority_fraction(0.25);
///
/// assert_eq!(budget.effective_max_tokens(), 121_904);
/// assert_eq!(budget.new_turn().high_priority_token_count(), 30_476);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistoryBudget {
    /// Maximum context window in tokens.
    max_tokens: usize,
    /// Tokens reserved for model output (per-response token limit).
    output_reserve: usize,
    /// Tokens reserved for the system prompt and tool definitions.
    system_reserve: usize,
    /// Share of the effective budget reserved for high-priority messages.
    high_priority_fraction: f64,
    /// Explicit high-priority allotment; overrides the fraction.
    high_priority_tokens: Option<usize>,
}

impl Default for HistoryBudget {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_CONTEXT_WINDOW,
            output_reserve: 0,
            system_reserve: 0,
            high_priority_fraction: DEFAULT_HIGH_PRIORITY_FRACTION,
            high_priority_tokens: None,
        }
    }
}

impl HistoryBudget {
    /// Load a budget from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, HistoryError> {
        let content = std::fs::read_to_string(path).map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let budget: Self = serde_json::from_str(&content)?;
        budget.validate()?;
        Ok(budget)
    }

    /// Override the context window size (in tokens).
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    /// Set tokens reserved for model output (the per-response max_tokens limit).
    pub fn with_output_reserve(mut self, tokens: usize) -> Self {
        self.output_reserve = tokens;
        self
    }

    /// Set tokens reserved for system prompt overhead.
    pub fn with_system_reserve(mut self, tokens: usize) -> Self {
        self.system_reserve = tokens;
        self
    }

    /// Reserve a share (clamped to `0.0..=1.0`) of the effective budget for
    /// recent messages.
    pub fn with_high_priority_fraction(mut self, fraction: f64) -> Self {
        self.high_priority_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Reserve a fixed number of tokens for recent messages.
    pub fn with_high_priority_tokens(mut self, tokens: usize) -> Self {
        self.high_priority_tokens = Some(tokens);
        self
    }

    /// Return the maximum context window size in tokens.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Effective history budget: max_tokens minus reserves for output and
    /// system prompt. This is the `token_budget` to pass to
    /// [`apply_budget`](super::apply_budget).
    pub fn effective_max_tokens(&self) -> usize {
        self.max_tokens
            .saturating_sub(self.output_reserve)
            .saturating_sub(self.system_reserve)
    }

    /// Tokens reserved for the most recent messages of a turn.
    pub fn high_priority_token_count(&self) -> usize {
        self.high_priority_tokens.unwrap_or_else(|| {
            (self.effective_max_tokens() as f64 * self.high_priority_fraction) as usize
        })
    }

    /// Start a new turn with this budget's high-priority allotment.
    pub fn new_turn(&self) -> TurnWindow {
        TurnWindow::new(self.high_priority_token_count())
    }

    /// Measure `messages` against the effective budget.
    pub fn usage(&self, messages: &[Message], counter: &dyn TokenCounter) -> ContextUsage {
        let estimated_tokens = counter.count(messages);
        let effective = self.effective_max_tokens();
        let usage_pct = if effective > 0 {
            estimated_tokens as f64 / effective as f64
        } else {
            1.0
        };
        ContextUsage {
            estimated_tokens,
            max_tokens: effective,
            usage_pct,
        }
    }

    fn validate(&self) -> Result<(), HistoryError> {
        if !(0.0..=1.0).contains(&self.high_priority_fraction) {
            return Err(HistoryError::Config(format!(
                "high_priority_fraction must be between 0 and 1, got {}",
                self.high_priority_fraction
            )));
        }
        if self.effective_max_tokens() == 0 {
            return Err(HistoryError::Config(format!(
                "reserves ({} output + {} system) leave no room in a {}-token context window",
                self.output_reserve, self.system_reserve, self.max_tokens
            )));
        }
        Ok(())
    }
}

/// Snapshot of history usage against the effective budget.
#[derive(Debug)]
pub struct ContextUsage {
    /// Tokens counted for the messages.
    pub estimated_tokens: usize,
    /// Effective history budget.
    pub max_tokens: usize,
    /// Usage as a fraction (0.0 to 1.0+).
    pub usage_pct: f64,
}

impl ContextUsage {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: ~{} tokens ({:.0}% of {})",
            self.estimated_tokens,
            self.usage_pct * 100.0,
            self.max_tokens,
        )
    }
}
