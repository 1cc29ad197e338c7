//! Event system for the Elisio client
//!
//! Provides the UI event definitions and the EventBus the selector service
//! publishes on. A renderer (terminal, web view, test) subscribes and redraws
//! whatever the event names.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{Level, ScanResult, SelectOption, Selection, VerseType};

/// Fetch slot a request or response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Option list of a hierarchy level
    Options(Level),
    /// Maximum verse number of the selected poem
    MaxVerse,
    /// Verse content for the entered verse number
    Verse,
    /// Scan output
    Scan,
}

/// Elisio UI events
///
/// Every visible state change of the selector service emits exactly one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiEvent {
    /// Option list of a level replaced ("All" is implied first)
    OptionsReplaced {
        level: Level,
        options: Vec<SelectOption>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Selection of a level changed; descendants were reset to "All"
    SelectionChanged {
        level: Level,
        selection: Selection,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Maximum verse number of the selected poem became known
    MaxVerseKnown {
        poem_id: i64,
        max_verse_number: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Verse input rejected; the dependent fetch was not issued
    VerseWarning {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Verse content loaded
    VerseLoaded {
        poem_id: i64,
        number: u32,
        text: String,
        verse_type: VerseType,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Scan output rendered (success or server-side failure)
    ScanRendered {
        result: ScanResult,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Whole selection restored from a random verse in one step
    SelectionRestored {
        author: i64,
        opus: i64,
        book: i64,
        poem: i64,
        verse_number: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A response arrived for a superseded request and was dropped
    StaleResponseDiscarded {
        slot: Slot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport failure; the request may be retried
    TransientError {
        slot: Slot,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Scan settings changed
    ScanSettingsChanged {
        verse_type: VerseType,
        dictionary: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl UiEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            UiEvent::OptionsReplaced { .. } => "OptionsReplaced",
            UiEvent::SelectionChanged { .. } => "SelectionChanged",
            UiEvent::MaxVerseKnown { .. } => "MaxVerseKnown",
            UiEvent::VerseWarning { .. } => "VerseWarning",
            UiEvent::VerseLoaded { .. } => "VerseLoaded",
            UiEvent::ScanRendered { .. } => "ScanRendered",
            UiEvent::SelectionRestored { .. } => "SelectionRestored",
            UiEvent::StaleResponseDiscarded { .. } => "StaleResponseDiscarded",
            UiEvent::TransientError { .. } => "TransientError",
            UiEvent::ScanSettingsChanged { .. } => "ScanSettingsChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the selector task)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use elisio_common::events::{EventBus, UiEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(UiEvent::VerseWarning {
///     message: "Insert a number please".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "VerseWarning");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: UiEvent) -> Result<usize, broadcast::error::SendError<UiEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
