//! Tool-call / tool-result pairing.
//!
//! Chat completion APIs reject a transcript where an assistant tool call is
//! not answered by its tool results, or where a tool result has no call.
//! Stored transcripts can still contain such gaps (an interrupted tool round,
//! a hand-edited file); [`repair_tool_pairs`] removes whatever is left
//! dangling before the budget engine sees the history.

use crate::history::message::HistoryKind;
use std::collections::HashSet;
use tracing::trace;

/// Remove unpaired tool calls and orphaned tool results, preserving the
/// relative order of everything else.
///
/// An assistant message with tool calls survives only if it is immediately
/// followed by one result for every call id; otherwise it is removed along
/// with its partial results. A tool result survives only as part of such a
/// group. Messages without tool linkage are always kept.
///
/// Returns the surviving items and the number removed.
pub fn repair_tool_pairs<T>(items: Vec<T>, kind_of: impl Fn(&T) -> &HistoryKind) -> (Vec<T>, usize) {
    let keep = pairing_mask(&items, &kind_of);
    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Keep flag for each item.
fn pairing_mask<T>(items: &[T], kind_of: &impl Fn(&T) -> &HistoryKind) -> Vec<bool> {
    let mut keep = vec![false; items.len()];
    let mut i = 0;

    while i < items.len() {
        match kind_of(&items[i]) {
            HistoryKind::Assistant { tool_call_ids } if !tool_call_ids.is_empty() => {
                let wanted: HashSet<&str> = tool_call_ids.iter().map(String::as_str).collect();
                let mut answered: HashSet<&str> = HashSet::new();
                let mut end = i + 1;
                while let Some(item) = items.get(end)
                    && let HistoryKind::ToolResult { tool_call_id } = kind_of(item)
                    && wanted.contains(tool_call_id.as_str())
                    && answered.insert(tool_call_id.as_str())
                {
                    end += 1;
                }

                if answered.len() == wanted.len() {
                    keep[i..end].fill(true);
                } else {
                    trace!(
                        "pairing: dropping tool call group at {i} ({}/{} results present)",
                        answered.len(),
                        wanted.len()
                    );
                }
                i = end;
            }
            HistoryKind::ToolResult { tool_call_id } => {
                trace!("pairing: dropping orphaned tool result for call '{tool_call_id}'");
                i += 1;
            }
            _ => {
                keep[i] = true;
                i += 1;
            }
        }
    }

    keep
}
