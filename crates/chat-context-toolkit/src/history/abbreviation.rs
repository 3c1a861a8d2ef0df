//! Ready-made abbreviated renderings.
//!
//! The budget engine never decides *how* a message is shortened; it only
//! swaps a [`HistoryMessage`](super::HistoryMessage)'s full rendering for its
//! abbreviated one. This module provides the usual abbreviations so callers
//! don't have to write their own:
//!
//! - tool results become a one-line `[Cleared: ...]` placeholder.
//! - long text keeps its head and tail with the middle elided.

use crate::history::message::HistoryMessage;
use crate::{Message, MessageRole};
use std::collections::HashMap;

/// Prefix of every tool-result placeholder produced here.
pub const CLEARED_PREFIX: &str = "[Cleared:";

/// Settings for [`default_abbreviation`].
#[derive(Debug, Clone)]
pub struct AbbreviationConfig {
    /// Characters kept from the start of long text.
    pub head_chars: usize,
    /// Characters kept from the end of long text.
    pub tail_chars: usize,
    /// Text at or below this many characters is left alone.
    pub min_chars: usize,
    /// Maximum length of an argument summary inside a placeholder (see
    /// [`abbreviate_history`]).
    pub args_summary_len: usize,
}

impl Default for AbbreviationConfig {
    fn default() -> Self {
        Self {
            head_chars: 400,
            tail_chars: 200,
            min_chars: 1000,
            args_summary_len: 80,
        }
    }
}

impl AbbreviationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how much of long text survives (head and tail, in characters).
    pub fn with_trim(mut self, head_chars: usize, tail_chars: usize) -> Self {
        self.head_chars = head_chars;
        self.tail_chars = tail_chars;
        self
    }

    /// Set the length threshold below which text is never trimmed.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }
}

/// Pick an abbreviated rendering for `message`, or `None` when there is
/// nothing worth shortening.
///
/// Tool results become a placeholder that keeps the `tool_call_id`. Text
/// messages longer than `min_chars` are soft-trimmed; assistant tool calls
/// keep their calls untouched so pairing is unaffected.
pub fn default_abbreviation(message: &Message, config: &AbbreviationConfig) -> Option<Message> {
    let content = message.content.as_deref()?;

    if message.role == MessageRole::Tool {
        if is_placeholder(content) {
            return None;
        }
        let call_id = message.tool_call_id.clone().unwrap_or_default();
        let placeholder = format!(
            "{CLEARED_PREFIX} tool result {call_id} ({} chars)]",
            content.chars().count()
        );
        if placeholder.chars().count() >= content.chars().count() {
            return None;
        }
        return Some(Message::tool_result(call_id, placeholder));
    }

    if content.chars().count() <= config.min_chars.max(config.head_chars + config.tail_chars) {
        return None;
    }
    let mut short = message.clone();
    short.content = Some(soft_trim(content, config.head_chars, config.tail_chars));
    Some(short)
}

/// Build a placeholder tool result for a call whose tool name and arguments
/// are known.
pub fn abbreviate_tool_result(
    call_id: impl Into<String>,
    tool_name: &str,
    args_summary: &str,
    char_count: usize,
) -> Message {
    Message::tool_result(
        call_id,
        format!("{CLEARED_PREFIX} {tool_name}({args_summary}), {char_count} chars]"),
    )
}

/// Fill in default abbreviations across a whole history.
///
/// Like [`HistoryMessage::with_default_abbreviation`], except that a tool
/// result whose call appears in `history` gets a placeholder naming the tool
/// and summarizing its arguments. Messages that already have an
/// abbreviation are left as they are.
pub fn abbreviate_history(
    history: Vec<HistoryMessage>,
    config: &AbbreviationConfig,
) -> Vec<HistoryMessage> {
    let calls: HashMap<String, (String, String)> = history
        .iter()
        .filter_map(|m| m.full().tool_calls.as_deref())
        .flatten()
        .map(|c| {
            (
                c.id.clone(),
                (c.function.name.clone(), c.function.arguments.clone()),
            )
        })
        .collect();

    history
        .into_iter()
        .map(|m| {
            if m.has_abbreviation() {
                return m;
            }
            match named_placeholder(m.full(), &calls, config) {
                Some(placeholder) => m.with_abbreviation(placeholder),
                None => m.with_default_abbreviation(config),
            }
        })
        .collect()
}

/// Placeholder for a tool result whose call is known, if it is shorter than
/// the result itself.
fn named_placeholder(
    message: &Message,
    calls: &HashMap<String, (String, String)>,
    config: &AbbreviationConfig,
) -> Option<Message> {
    if message.role != MessageRole::Tool {
        return None;
    }
    let call_id = message.tool_call_id.as_deref()?;
    let content = message.content.as_deref()?;
    let (name, arguments) = calls.get(call_id)?;
    if is_placeholder(content) {
        return None;
    }
    let placeholder = abbreviate_tool_result(
        call_id,
        name,
        &summarize_args(arguments, config.args_summary_len),
        content.chars().count(),
    );
    (placeholder.rendered_chars() < message.rendered_chars()).then_some(placeholder)
}

/// Whether `content` is already a placeholder.
pub fn is_placeholder(content: &str) -> bool {
    content.starts_with(CLEARED_PREFIX)
}

/// Keep the first `head_chars` and last `tail_chars` characters of
/// `content`, replacing the middle with an omission marker.
///
/// Content no longer than `head_chars + tail_chars` is returned unchanged.
/// Counts are in characters, so multi-byte text is never split.
pub fn soft_trim(content: &str, head_chars: usize, tail_chars: usize) -> String {
    let total = content.chars().count();
    if total <= head_chars + tail_chars {
        return content.to_string();
    }
    let head: String = content.chars().take(head_chars).collect();
    let tail: String = content.chars().skip(total - tail_chars).collect();
    let omitted = total - head_chars - tail_chars;
    format!("{head}...[{omitted} chars omitted]...{tail}")
}

/// Extract a short argument summary from raw JSON arguments for use in
/// placeholders.
pub fn summarize_args(arguments: &str, max_len: usize) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(arguments)
        && let Some(obj) = v.as_object()
    {
        let parts: Vec<String> = obj
            .iter()
            .take(3)
            .map(|(k, v)| {
                let val = match v {
                    serde_json::Value::String(s) => format!("\"{}\"", truncate_chars(s, 40)),
                    other => truncate_chars(&other.to_string(), 40),
                };
                format!("{k}={val}")
            })
            .collect();
        return truncate_chars(&parts.join(", "), max_len);
    }

    // Fallback: truncate raw arguments.
    truncate_chars(arguments, max_len)
}

/// Truncate to at most `max_len` characters, ending in `...` when cut.
fn truncate_chars(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;

    #[test]
    fn tool_result_becomes_placeholder() {
        let msg = Message::tool_result("c1", "a".repeat(10_000));
        let short = default_abbreviation(&msg, &AbbreviationConfig::default()).unwrap();
        assert_eq!(short.tool_call_id.as_deref(), Some("c1"));
        let content = short.content.unwrap();
        assert!(is_placeholder(&content));
        assert!(content.contains("10000 chars"));
    }

    #[test]
    fn short_tool_result_is_left_alone() {
        let msg = Message::tool_result("c1", "ok");
        assert!(default_abbreviation(&msg, &AbbreviationConfig::default()).is_none());
    }

    #[test]
    fn existing_placeholder_is_not_reabbreviated() {
        let msg = abbreviate_tool_result("c1", "read_file", "path=\"a.rs\"", 5000);
        assert!(default_abbreviation(&msg, &AbbreviationConfig::default()).is_none());
    }

    #[test]
    fn long_text_is_soft_trimmed() {
        let config = AbbreviationConfig::new().with_trim(10, 5).with_min_chars(20);
        let msg = Message::user(format!("{}{}{}", "h".repeat(10), "m".repeat(100), "t".repeat(5)));
        let short = default_abbreviation(&msg, &config).unwrap();
        assert_eq!(short.role, MessageRole::User);
        let content = short.content.unwrap();
        assert!(content.starts_with("hhhhhhhhhh..."));
        assert!(content.ends_with("...ttttt"));
        assert!(content.contains("100 chars omitted"));
    }

    #[test]
    fn short_text_has_no_abbreviation() {
        let msg = Message::assistant_text("fine");
        assert!(default_abbreviation(&msg, &AbbreviationConfig::default()).is_none());
    }

    #[test]
    fn tool_calls_survive_text_trim() {
        let config = AbbreviationConfig::new().with_trim(4, 4).with_min_chars(10);
        let mut msg = Message::assistant_tool_calls(vec![ToolCall::function("c1", "ls", "{}")]);
        msg.content = Some("x".repeat(50));
        let short = default_abbreviation(&msg, &config).unwrap();
        assert_eq!(short.tool_call_ids(), vec!["c1"]);
    }

    #[test]
    fn soft_trim_is_char_safe() {
        let text = "é".repeat(50);
        let trimmed = soft_trim(&text, 3, 3);
        assert!(trimmed.starts_with("ééé..."));
        assert!(trimmed.contains("44 chars omitted"));
    }

    #[test]
    fn soft_trim_leaves_short_content() {
        assert_eq!(soft_trim("short", 10, 10), "short");
    }

    #[test]
    fn summarize_args_json() {
        let args = r#"{"path": "src/main.rs", "encoding": "utf-8"}"#;
        let summary = summarize_args(args, 100);
        assert!(summary.contains("path="));
        assert!(summary.contains("src/main.rs"));
    }

    #[test]
    fn summarize_args_truncates_long_values() {
        let args = format!(r#"{{"query": "{}"}}"#, "x".repeat(100));
        let summary = summarize_args(&args, 100);
        assert!(summary.contains("..."));
    }

    #[test]
    fn summarize_args_falls_back_to_raw_text() {
        let summary = summarize_args("not json at all", 8);
        assert_eq!(summary, "not j...");
    }

    #[test]
    fn history_placeholders_name_the_tool() {
        let history = vec![
            HistoryMessage::new(
                "call",
                Message::assistant_tool_calls(vec![ToolCall::function(
                    "c1",
                    "read_file",
                    r#"{"path":"app.log"}"#,
                )]),
            ),
            HistoryMessage::new("log", Message::tool_result("c1", "line\n".repeat(400))),
            HistoryMessage::new("orphan", Message::tool_result("c9", "z".repeat(2000))),
            HistoryMessage::new("q", Message::user("Any errors?")),
        ];
        let history = abbreviate_history(history, &AbbreviationConfig::default());

        assert_eq!(
            history[1].abbreviated().content.as_deref(),
            Some("[Cleared: read_file(path=\"app.log\"), 2000 chars]")
        );
        assert_eq!(history[1].abbreviated().tool_call_id.as_deref(), Some("c1"));
        // Unknown call: generic placeholder.
        assert_eq!(
            history[2].abbreviated().content.as_deref(),
            Some("[Cleared: tool result c9 (2000 chars)]")
        );
        assert!(!history[0].has_abbreviation());
        assert!(!history[3].has_abbreviation());
    }

    #[test]
    fn history_keeps_existing_abbreviations() {
        let history = vec![
            HistoryMessage::new("m1", Message::user("x".repeat(5000)))
                .with_abbreviation(Message::user("mine")),
        ];
        let history = abbreviate_history(history, &AbbreviationConfig::default());
        assert_eq!(history[0].abbreviated().content.as_deref(), Some("mine"));
    }
}
