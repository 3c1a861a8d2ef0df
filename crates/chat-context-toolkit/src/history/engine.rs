//! The budget engine: fit candidate history into a token budget.
//!
//! Candidates are handled in *tool units*: an assistant message carrying
//! tool calls together with the results that immediately follow it, or any
//! other single message. A unit is abbreviated message by message but only
//! ever dropped whole, so trimming never splits a call from its results.
//!
//! Order of preference when the history is too large:
//!
//! 1. abbreviate low-priority messages, oldest first;
//! 2. drop low-priority units, oldest first;
//! 3. abbreviate high-priority messages, then drop high-priority units,
//!    oldest first, never touching the most recent unit;
//! 4. abbreviate the most recent unit;
//! 5. give up with [`HistoryError::BudgetInfeasible`].
//!
//! Every check measures the whole candidate list with the
//! [`TokenCounter`], so counters with per-request overhead are handled
//! correctly. Malformed pairs in the input (unanswered calls, orphaned
//! results) are removed before budgeting.

use crate::history::message::{HistoryKind, HistoryMessage, Rendering};
use crate::history::pairing::repair_tool_pairs;
use crate::history::provider::MessageProvider;
use crate::history::token_counter::TokenCounter;
use crate::history::turn::TurnWindow;
use crate::{HistoryError, Message};
use std::collections::VecDeque;
use std::ops::Range;
use tracing::{debug, trace, warn};

/// Fit the current history into `token_budget`.
///
/// Fetches the full history from `message_provider` and runs
/// [`BudgetEngine::fit`] on it. Call this once per completion request,
/// reusing the same `turn` for every request made during one agent turn.
pub async fn apply_budget(
    turn: &mut TurnWindow,
    token_budget: usize,
    token_counter: &dyn TokenCounter,
    message_provider: &dyn MessageProvider,
) -> Result<BudgetedResult, HistoryError> {
    let candidates = message_provider.messages(None).await?;
    BudgetEngine::new(token_budget, token_counter).fit(turn, &candidates)
}

/// What survived budgeting, ready to send.
#[derive(Debug, Clone, Default)]
pub struct BudgetedResult {
    /// API-shaped messages in original order.
    pub messages: Vec<Message>,
    /// One entry per element of `messages`, describing where it came from.
    pub entries: Vec<BudgetedEntry>,
    pub report: BudgetReport,
}

impl BudgetedResult {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Ids of the surviving history messages, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }
}

/// Provenance of one returned message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetedEntry {
    pub id: String,
    pub rendering: Rendering,
    pub high_priority: bool,
}

/// Summary of the decisions made by one budgeting call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetReport {
    pub token_budget: usize,
    /// Tokens of the returned messages.
    pub total_tokens: usize,
    pub candidate_count: usize,
    pub high_priority_count: usize,
    pub low_priority_count: usize,
    /// Messages sent in their abbreviated rendering (including any later
    /// dropped).
    pub abbreviated_count: usize,
    pub dropped_count: usize,
    /// Malformed tool calls and results removed from the input.
    pub unpaired_removed: usize,
}

impl BudgetReport {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "history: {} tokens of {} budget; {} high / {} low priority, {} abbreviated, {} dropped, {} unpaired removed",
            self.total_tokens,
            self.token_budget,
            self.high_priority_count,
            self.low_priority_count,
            self.abbreviated_count,
            self.dropped_count,
            self.unpaired_removed,
        )
    }
}

/// A candidate message and the rendering currently chosen for it.
#[derive(Debug, Clone, Copy)]
struct Slot<'m> {
    message: &'m HistoryMessage,
    rendering: Rendering,
    high_priority: bool,
}

impl<'m> Slot<'m> {
    fn full(message: &'m HistoryMessage, high_priority: bool) -> Self {
        Self {
            message,
            rendering: Rendering::Full,
            high_priority,
        }
    }

    fn rendered(&self) -> &'m Message {
        self.message.rendering(self.rendering)
    }
}

/// Split well-paired candidates into tool units.
fn tool_units(candidates: &[&HistoryMessage]) -> Vec<Range<usize>> {
    let mut units = Vec::new();
    let mut start = 0;
    while start < candidates.len() {
        let mut end = start + 1;
        if candidates[start].kind().has_tool_calls() {
            while let Some(next) = candidates.get(end)
                && matches!(next.kind(), HistoryKind::ToolResult { .. })
            {
                end += 1;
            }
        }
        units.push(start..end);
        start = end;
    }
    units
}

/// Units still in the running, oldest first, with their current renderings
/// flattened in the same order.
struct Selection<'m> {
    units: VecDeque<Vec<Slot<'m>>>,
    rendered: Vec<Message>,
}

impl<'m> Selection<'m> {
    fn new(candidates: &[&'m HistoryMessage], units: &[Range<usize>], high_start: usize) -> Self {
        let units = units
            .iter()
            .map(|unit| {
                candidates[unit.clone()]
                    .iter()
                    .map(|&m| Slot::full(m, unit.start >= high_start))
                    .collect()
            })
            .collect();
        let rendered = candidates.iter().map(|m| m.full().clone()).collect();
        Self { units, rendered }
    }

    /// Switch one message to its abbreviated rendering. Returns `false` if
    /// it has none or already uses it.
    fn abbreviate(&mut self, unit: usize, slot: usize) -> bool {
        let offset = self.units.iter().take(unit).map(Vec::len).sum::<usize>() + slot;
        let target = &mut self.units[unit][slot];
        if !target.message.has_abbreviation() || target.rendering == Rendering::Abbreviated {
            return false;
        }
        target.rendering = Rendering::Abbreviated;
        self.rendered[offset] = target.rendered().clone();
        trace!("history: abbreviated '{}'", target.message.id());
        true
    }

    /// Drop the oldest unit, returning how many messages it held.
    fn drop_oldest(&mut self) -> usize {
        let Some(unit) = self.units.pop_front() else {
            return 0;
        };
        self.rendered.drain(..unit.len());
        for slot in &unit {
            trace!("history: dropped '{}'", slot.message.id());
        }
        unit.len()
    }
}

/// Fits already-materialized candidates into a token budget.
pub struct BudgetEngine<'c> {
    token_budget: usize,
    counter: &'c dyn TokenCounter,
}

impl<'c> BudgetEngine<'c> {
    pub fn new(token_budget: usize, counter: &'c dyn TokenCounter) -> Self {
        Self {
            token_budget,
            counter,
        }
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Fit `candidates` (oldest first) into the budget.
    ///
    /// Pins the high-priority boundary on `turn` the first time it is called
    /// for a turn; later calls keep it.
    pub fn fit(
        &self,
        turn: &mut TurnWindow,
        candidates: &[HistoryMessage],
    ) -> Result<BudgetedResult, HistoryError> {
        let candidate_count = candidates.len();
        let (candidates, unpaired_removed) =
            repair_tool_pairs(candidates.iter().collect::<Vec<_>>(), |m| m.kind());

        let mut report = BudgetReport {
            token_budget: self.token_budget,
            candidate_count,
            unpaired_removed,
            ..Default::default()
        };

        if candidates.is_empty() {
            debug!("history: no candidate messages");
            return Ok(BudgetedResult {
                report,
                ..Default::default()
            });
        }

        let units = tool_units(&candidates);
        let start = self.high_priority_start(turn, &candidates, &units);
        let low_units = units.iter().take_while(|u| u.start < start).count();
        report.high_priority_count = candidates.len() - start;
        report.low_priority_count = start;

        let mut selection = Selection::new(&candidates, &units, start);

        if self.fits(&selection.rendered[start..]) {
            self.shrink(&mut selection, low_units, &mut report);
        } else {
            trace!("history: high-priority set alone exceeds budget, dropping low priority");
            for _ in 0..low_units {
                report.dropped_count += selection.drop_oldest();
            }

            let eligible = selection.units.len() - 1;
            self.shrink(&mut selection, eligible, &mut report);
            self.fit_most_recent(&mut selection, &mut report)?;
        }

        let Selection { units, rendered } = selection;
        let entries = units
            .iter()
            .flatten()
            .map(|s| BudgetedEntry {
                id: s.message.id().to_string(),
                rendering: s.rendering,
                high_priority: s.high_priority,
            })
            .collect();
        report.total_tokens = self.counter.count(&rendered);

        debug!("{}", report.to_log_string());

        Ok(BudgetedResult {
            messages: rendered,
            entries,
            report,
        })
    }

    /// Index of the first high-priority candidate, always the start of a
    /// tool unit.
    ///
    /// Uses the boundary pinned on `turn` when it is still present in
    /// `candidates`; otherwise computes it from the tail and pins it.
    fn high_priority_start(
        &self,
        turn: &mut TurnWindow,
        candidates: &[&HistoryMessage],
        units: &[Range<usize>],
    ) -> usize {
        if let Some(id) = turn.pinned_boundary() {
            if let Some(pos) = candidates.iter().position(|m| m.id() == id) {
                let start = units
                    .iter()
                    .find(|u| u.contains(&pos))
                    .map_or(pos, |u| u.start);
                trace!("history: using pinned boundary '{id}' at index {start}");
                return start;
            }
            warn!("history: pinned boundary '{id}' is no longer in the history, recomputing");
        }

        let start = self.compute_boundary(turn.high_priority_token_count(), candidates, units);
        turn.pin(candidates[start].id());
        debug!(
            "history: pinned high-priority boundary at '{}' ({} of {} messages high priority)",
            candidates[start].id(),
            candidates.len() - start,
            candidates.len()
        );
        start
    }

    /// Walk back from the most recent unit while the running total of full
    /// renderings stays within `allotment`. The most recent unit is always
    /// included.
    fn compute_boundary(
        &self,
        allotment: usize,
        candidates: &[&HistoryMessage],
        units: &[Range<usize>],
    ) -> usize {
        let cost = |unit: &Range<usize>| {
            candidates[unit.clone()]
                .iter()
                .map(|m| self.counter.count_one(m.full()))
                .fold(0, usize::saturating_add)
        };
        let Some((last, earlier)) = units.split_last() else {
            return 0;
        };

        let mut total = cost(last);
        let mut start = last.start;
        for unit in earlier.iter().rev() {
            let with_unit = total.saturating_add(cost(unit));
            if with_unit > allotment {
                break;
            }
            total = with_unit;
            start = unit.start;
        }
        start
    }

    /// Abbreviate the messages of the first `eligible` units, then drop those
    /// units, oldest first, until the selection fits the budget.
    fn shrink(&self, selection: &mut Selection<'_>, eligible: usize, report: &mut BudgetReport) {
        for unit in 0..eligible {
            for slot in 0..selection.units[unit].len() {
                if self.fits(&selection.rendered) {
                    return;
                }
                if selection.abbreviate(unit, slot) {
                    report.abbreviated_count += 1;
                }
            }
        }

        let mut dropped = 0;
        while dropped < eligible && !self.fits(&selection.rendered) {
            report.dropped_count += selection.drop_oldest();
            dropped += 1;
        }
    }

    /// Last resort when only the most recent unit is left and it still
    /// doesn't fit: abbreviate its messages oldest first, else fail.
    fn fit_most_recent(
        &self,
        selection: &mut Selection<'_>,
        report: &mut BudgetReport,
    ) -> Result<(), HistoryError> {
        let Some(last) = selection.units.len().checked_sub(1) else {
            return Ok(());
        };
        for slot in 0..selection.units[last].len() {
            if self.fits(&selection.rendered) {
                return Ok(());
            }
            if selection.abbreviate(last, slot) {
                report.abbreviated_count += 1;
            }
        }
        if self.fits(&selection.rendered) {
            return Ok(());
        }

        let cheapest: Vec<Message> = selection.units[last]
            .iter()
            .map(|s| {
                let (full, short) = (s.message.full(), s.message.abbreviated());
                if self.counter.count_one(short) < self.counter.count_one(full) {
                    short.clone()
                } else {
                    full.clone()
                }
            })
            .collect();
        let required = self.counter.count(&cheapest);
        let id = selection.units[last]
            .last()
            .map_or("", |s| s.message.id());
        warn!(
            "history: budget of {} tokens cannot hold the most recent message '{id}' ({required} tokens)",
            self.token_budget
        );
        Err(HistoryError::BudgetInfeasible {
            budget: self.token_budget,
            required,
        })
    }

    fn fits(&self, rendered: &[Message]) -> bool {
        self.counter.count(rendered) <= self.token_budget
    }
}
