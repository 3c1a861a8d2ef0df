//! Message providers: where candidate history comes from.
//!
//! A provider returns the ordered history (oldest first) for "right now".
//! During one turn it is called repeatedly and may return a longer list each
//! time as tool calls and results are appended.

use crate::HistoryError;
use crate::history::message::HistoryMessage;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use tracing::trace;

/// Boxed future returned by [`MessageProvider::messages`].
///
/// Type alias to keep trait signatures and implementations readable.
pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<HistoryMessage>, HistoryError>> + Send + 'a>>;

/// Source of candidate history messages.
///
/// Uses a boxed future so that the trait is dyn-compatible (object-safe) and
/// implementations can read from a remote conversation store.
///
/// # Example
///
/// ```ignore
/// struct StoreProvider { store: ConversationStore, conversation_id: String }
///
/// impl MessageProvider for StoreProvider {
///     fn messages<'a>(&'a self, after: Option<&'a str>) -> ProviderFuture<'a> {
///         Box::pin(async move {
///             let rows = self.store.list(&self.conversation_id, after).await
///                 .map_err(|e| HistoryError::Provider(e.to_string()))?;
///             Ok(rows.into_iter().map(to_history_message).collect())
///         })
///     }
/// }
/// ```
pub trait MessageProvider: Send + Sync {
    /// Messages in order, oldest first. With `after = Some(id)`, only the
    /// messages that follow the message with that id.
    fn messages<'a>(&'a self, after: Option<&'a str>) -> ProviderFuture<'a>;
}

/// Slice `messages` to those after the message with id `after`.
fn messages_after(
    messages: &[HistoryMessage],
    after: Option<&str>,
) -> Result<Vec<HistoryMessage>, HistoryError> {
    let Some(after) = after else {
        return Ok(messages.to_vec());
    };
    let pos = messages
        .iter()
        .position(|m| m.id() == after)
        .ok_or_else(|| HistoryError::Provider(format!("unknown message id '{after}'")))?;
    Ok(messages[pos + 1..].to_vec())
}

impl MessageProvider for Vec<HistoryMessage> {
    fn messages<'a>(&'a self, after: Option<&'a str>) -> ProviderFuture<'a> {
        Box::pin(async move { messages_after(self, after) })
    }
}

/// Appendable in-memory history.
///
/// Interior mutability lets a turn keep appending (`push`) while the same
/// provider is handed to the budget engine by shared reference.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    messages: Mutex<Vec<HistoryMessage>>,
}

impl InMemoryProvider {
    pub fn new(messages: Vec<HistoryMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }

    /// Append a message to the end of the history.
    pub fn push(&self, message: HistoryMessage) {
        let mut guard = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        trace!("history: appending message {}", message.id());
        guard.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageProvider for InMemoryProvider {
    fn messages<'a>(&'a self, after: Option<&'a str>) -> ProviderFuture<'a> {
        // Snapshot before building the future so the guard never lives inside it.
        let snapshot = {
            let guard = self.messages.lock().unwrap_or_else(|e| e.into_inner());
            messages_after(&guard, after)
        };
        Box::pin(async move { snapshot })
    }
}
