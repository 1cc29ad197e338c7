//! Hierarchical author → opus → book → poem → verse selector

mod cascade;
mod service;

pub use cascade::{FetchOutcome, FetchRequest, LevelState, SelectionState, ALL_LABEL};
pub use service::{spawn_selector, Outcome, PendingOutcome, ScanTarget, SelectorHandle};
