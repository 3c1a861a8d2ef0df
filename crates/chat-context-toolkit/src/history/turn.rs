//! The high-priority window for one agent turn.
//!
//! A turn may make several completion calls (one per tool-call round), and
//! history grows between them. The boundary between "recent" and "old"
//! messages is decided on the first call and then pinned, so a message that
//! was old on the first call is never promoted later in the same turn, while
//! every newly appended message lands in the recent set.

/// Default high-priority allotment, in tokens.
pub const DEFAULT_HIGH_PRIORITY_TOKENS: usize = 30_000;

/// High-priority token allotment plus the boundary pinned for this turn.
///
/// Create one when a turn starts (e.g. a new user request), pass it by
/// `&mut` to every [`apply_budget`](super::apply_budget) call made during the
/// turn, and drop it when the turn ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnWindow {
    high_priority_token_count: usize,
    /// Id of the oldest high-priority message, set by the first budgeting
    /// call of the turn.
    boundary_id: Option<String>,
}

impl Default for TurnWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_PRIORITY_TOKENS)
    }
}

impl TurnWindow {
    pub fn new(high_priority_token_count: usize) -> Self {
        Self {
            high_priority_token_count,
            boundary_id: None,
        }
    }

    pub fn high_priority_token_count(&self) -> usize {
        self.high_priority_token_count
    }

    /// Id of the oldest high-priority message, once pinned.
    pub fn pinned_boundary(&self) -> Option<&str> {
        self.boundary_id.as_deref()
    }

    pub fn is_pinned(&self) -> bool {
        self.boundary_id.is_some()
    }

    /// Forget the pinned boundary, starting a new turn with the same allotment.
    pub fn reset(&mut self) {
        self.boundary_id = None;
    }

    pub(crate) fn pin(&mut self, id: impl Into<String>) {
        self.boundary_id = Some(id.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_window_is_unpinned() {
        let turn = TurnWindow::new(500);
        assert_eq!(turn.high_priority_token_count(), 500);
        assert!(!turn.is_pinned());
        assert_eq!(turn.pinned_boundary(), None);
    }

    #[test]
    fn pin_and_reset() {
        let mut turn = TurnWindow::default();
        assert_eq!(turn.high_priority_token_count(), DEFAULT_HIGH_PRIORITY_TOKENS);

        turn.pin("m3");
        assert_eq!(turn.pinned_boundary(), Some("m3"));

        turn.reset();
        assert!(!turn.is_pinned());
        assert_eq!(turn.high_priority_token_count(), DEFAULT_HIGH_PRIORITY_TOKENS);
    }
}
