//! Session-scoped UI state
//!
//! One `UiState` per session, owned by the selector service task. Handlers
//! receive it by reference; nothing here is global.

use elisio_common::events::Slot;
use elisio_common::models::VerseType;
use std::collections::HashMap;

use crate::scan::ScanView;
use crate::selector::SelectionState;
use crate::verse::VerseView;

/// Request generation of one fetch slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

/// Issued with every request; its response is applied only while the ticket
/// is still the newest for its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub slot: Slot,
    pub generation: Generation,
}

/// Per-slot generation counters
#[derive(Debug, Clone, Default)]
pub struct Generations {
    counters: HashMap<Slot, u64>,
}

impl Generations {
    /// Start a new request for `slot`, superseding any earlier one
    pub fn issue(&mut self, slot: Slot) -> Ticket {
        let counter = self.counters.entry(slot).or_insert(0);
        *counter += 1;
        Ticket { slot, generation: Generation(*counter) }
    }

    /// Supersede outstanding requests for `slot` without starting a new one
    pub fn invalidate(&mut self, slot: Slot) {
        *self.counters.entry(slot).or_insert(0) += 1;
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.counters.get(&ticket.slot).copied().unwrap_or(0) == ticket.generation.0
    }
}

/// Everything the page shows
#[derive(Debug, Clone)]
pub struct UiState {
    /// Author/opus/book/poem fields and the max-verse cache
    pub selection: SelectionState,
    /// Last accepted verse number
    pub verse_number: Option<u32>,
    pub verse: Option<VerseView>,
    /// Metre used for scan requests
    pub verse_type: VerseType,
    /// Dictionary lookups enabled for scan requests
    pub dictionary: bool,
    pub scan: ScanView,
    /// Inline validation message
    pub warning: Option<String>,
    /// Last transport/server failure; cleared by the next successful fetch
    pub transient_error: Option<String>,
    pub(crate) generations: Generations,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selection: SelectionState::default(),
            verse_number: None,
            verse: None,
            verse_type: VerseType::Unknown,
            dictionary: true,
            scan: ScanView::default(),
            warning: None,
            transient_error: None,
            generations: Generations::default(),
        }
    }
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the verse-level display after the hierarchy changed
    pub(crate) fn clear_verse(&mut self) {
        self.verse_number = None;
        self.verse = None;
        self.warning = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elisio_common::models::Level;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut generations = Generations::default();
        let first = generations.issue(Slot::Options(Level::Opus));
        let second = generations.issue(Slot::Options(Level::Opus));

        assert!(!generations.is_current(&first));
        assert!(generations.is_current(&second));
    }

    #[test]
    fn test_invalidate_without_new_request() {
        let mut generations = Generations::default();
        let ticket = generations.issue(Slot::MaxVerse);
        generations.invalidate(Slot::MaxVerse);
        assert!(!generations.is_current(&ticket));
    }

    #[test]
    fn test_slots_are_independent() {
        let mut generations = Generations::default();
        let verse = generations.issue(Slot::Verse);
        generations.issue(Slot::Scan);
        generations.invalidate(Slot::Options(Level::Book));
        assert!(generations.is_current(&verse));
    }

    #[test]
    fn test_default_state() {
        let state = UiState::new();
        assert!(state.dictionary);
        assert_eq!(state.verse_type, VerseType::Unknown);
        assert!(state.selection.max_verse_number().is_none());
    }
}
