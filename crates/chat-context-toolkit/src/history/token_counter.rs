//! Token counting: the oracle the budget engine measures everything with.
//!
//! The engine never assumes a particular tokenizer. It only requires a
//! [`TokenCounter`] that is deterministic and monotonic: adding a message to
//! the list never lowers the count.

use crate::Message;

/// Default characters per token (conservative estimate for English text).
/// Most tokenizers average 3-4 chars per token; we use 3.5 as a middle ground.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Counts the tokens a list of rendered messages would cost.
///
/// Any `Fn(&[Message]) -> usize` closure is a token counter:
///
/// ```
/// use chat_context_toolkit::Message;
/// use chat_context_toolkit::history::TokenCounter;
///
/// let words = |msgs: &[Message]| -> usize {
///     msgs.iter()
///         .map(|m| m.content.as_deref().unwrap_or("").split_whitespace().count())
///         .sum()
/// };
/// assert_eq!(words.count(&[Message::user("two words")]), 2);
/// ```
pub trait TokenCounter: Send + Sync {
    /// Token count of `messages`, in order, as one request would see them.
    fn count(&self, messages: &[Message]) -> usize;

    /// Token count of a single message.
    fn count_one(&self, message: &Message) -> usize {
        self.count(std::slice::from_ref(message))
    }
}

impl<F> TokenCounter for F
where
    F: Fn(&[Message]) -> usize + Send + Sync,
{
    fn count(&self, messages: &[Message]) -> usize {
        self(messages)
    }
}

/// Estimates tokens from rendered characters.
///
/// Each message costs `ceil(rendered_chars / chars_per_token)`, where
/// rendered characters are the content plus tool-call names and arguments
/// (see [`Message::rendered_chars`]). Summing per message keeps the count
/// monotonic.
#[derive(Debug, Clone, Copy)]
pub struct CharTokenCounter {
    chars_per_token: f64,
}

impl Default for CharTokenCounter {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl CharTokenCounter {
    /// Create a counter with a calibrated chars-per-token ratio. Non-positive
    /// or non-finite ratios fall back to the default.
    pub fn with_ratio(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }

    /// One token per character.
    pub fn exact() -> Self {
        Self {
            chars_per_token: 1.0,
        }
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }
}

impl TokenCounter for CharTokenCounter {
    fn count(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| (m.rendered_chars() as f64 / self.chars_per_token).ceil() as usize)
            .sum()
    }
}

/// Counts tokens with a real BPE encoding via `tiktoken-rs`.
///
/// Each message costs its encoded content, role, and tool-call fields plus a
/// fixed per-message overhead for the chat framing.
#[cfg(feature = "tiktoken")]
pub struct BpeTokenCounter {
    bpe: tiktoken_rs::CoreBPE,
    per_message_overhead: usize,
}

#[cfg(feature = "tiktoken")]
impl BpeTokenCounter {
    /// Tokens added per message for role and framing.
    pub const DEFAULT_OVERHEAD: usize = 4;

    /// `cl100k_base` encoding (GPT-4 / GPT-3.5 family).
    pub fn cl100k() -> Result<Self, crate::HistoryError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| crate::HistoryError::Config(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self {
            bpe,
            per_message_overhead: Self::DEFAULT_OVERHEAD,
        })
    }

    /// `o200k_base` encoding (GPT-4o family).
    pub fn o200k() -> Result<Self, crate::HistoryError> {
        let bpe = tiktoken_rs::o200k_base()
            .map_err(|e| crate::HistoryError::Config(format!("failed to load o200k_base: {e}")))?;
        Ok(Self {
            bpe,
            per_message_overhead: Self::DEFAULT_OVERHEAD,
        })
    }

    pub fn with_overhead(mut self, tokens: usize) -> Self {
        self.per_message_overhead = tokens;
        self
    }

    fn encoded_len(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

#[cfg(feature = "tiktoken")]
impl TokenCounter for BpeTokenCounter {
    fn count(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| {
                let content = m.content.as_deref().map_or(0, |c| self.encoded_len(c));
                let calls: usize = m
                    .tool_calls
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|c| {
                        self.encoded_len(&c.function.name) + self.encoded_len(&c.function.arguments)
                    })
                    .sum();
                content + calls + self.encoded_len(&m.role.to_string()) + self.per_message_overhead
            })
            .sum()
    }
}
