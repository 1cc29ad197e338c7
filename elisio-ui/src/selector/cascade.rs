//! Cascade model of the author → opus → book → poem fields
//!
//! Pure state: no I/O happens here. Changing a level returns the fetch that
//! must run next, and the caller feeds the result back in.

use elisio_common::events::Slot;
use elisio_common::models::{HierarchyPath, Level, SelectOption, Selection};
use tracing::debug;

use crate::api::CorpusApi;
use crate::error::ApiResult;

/// Label of the implicit first entry of every option list
pub const ALL_LABEL: &str = "All";

/// One selection field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelState {
    /// Fetched entries; "All" is implied and not stored
    pub options: Vec<SelectOption>,
    pub selected: Selection,
}

/// The four chained selection fields plus the selected poem's verse count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    levels: [LevelState; 4],
    max_verse_number: Option<u32>,
}

/// Fetch required after a selection change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRequest {
    /// Root option list
    Authors,
    /// Option list of `level` under the parent's selected id
    Children { level: Level, parent_id: i64 },
    /// Verse count of the selected poem
    MaxVerse { poem_id: i64 },
}

/// Result of a `FetchRequest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Options { level: Level, options: Vec<SelectOption> },
    MaxVerse { poem_id: i64, max_verse_number: u32 },
}

impl FetchRequest {
    pub fn slot(&self) -> Slot {
        match self {
            FetchRequest::Authors => Slot::Options(Level::Author),
            FetchRequest::Children { level, .. } => Slot::Options(*level),
            FetchRequest::MaxVerse { .. } => Slot::MaxVerse,
        }
    }

    /// Run the request against the server
    pub async fn run(&self, api: &dyn CorpusApi) -> ApiResult<FetchOutcome> {
        debug!(request = ?self, "Fetching");
        let outcome = match *self {
            FetchRequest::Authors => FetchOutcome::Options {
                level: Level::Author,
                options: api.authors().await?.iter().map(SelectOption::from).collect(),
            },
            FetchRequest::Children { level, parent_id } => {
                let options: Vec<SelectOption> = match level {
                    Level::Author => api.authors().await?.iter().map(SelectOption::from).collect(),
                    Level::Opus => api.opera(parent_id).await?.iter().map(SelectOption::from).collect(),
                    Level::Book => api.books(parent_id).await?.iter().map(SelectOption::from).collect(),
                    Level::Poem => api.poems(parent_id).await?.iter().map(SelectOption::from).collect(),
                };
                FetchOutcome::Options { level, options }
            }
            FetchRequest::MaxVerse { poem_id } => FetchOutcome::MaxVerse {
                poem_id,
                max_verse_number: api.max_verse_number(poem_id).await?,
            },
        };
        Ok(outcome)
    }
}

impl SelectionState {
    pub fn level(&self, level: Level) -> &LevelState {
        &self.levels[level.index()]
    }

    pub fn selected(&self, level: Level) -> Selection {
        self.levels[level.index()].selected
    }

    /// Option labels as displayed, "All" first
    pub fn option_labels(&self, level: Level) -> Vec<String> {
        std::iter::once(ALL_LABEL.to_string())
            .chain(self.level(level).options.iter().map(|o| o.label.clone()))
            .collect()
    }

    pub fn has_option(&self, level: Level, id: i64) -> bool {
        self.level(level).options.iter().any(|o| o.id == id)
    }

    /// Selected poem id, if a specific poem is selected
    pub fn selected_poem(&self) -> Option<i64> {
        self.selected(Level::Poem).id()
    }

    /// Verse count of the selected poem, once known
    pub fn max_verse_number(&self) -> Option<u32> {
        self.max_verse_number
    }

    /// Full path when every level has a specific selection
    pub fn path(&self) -> Option<HierarchyPath> {
        Some(HierarchyPath {
            author: self.selected(Level::Author).id()?,
            opus: self.selected(Level::Opus).id()?,
            book: self.selected(Level::Book).id()?,
            poem: self.selected(Level::Poem).id()?,
        })
    }

    /// Change the selection of `level`
    ///
    /// Every level below is reset to "All" with an empty option list and the
    /// verse count is forgotten. Returns the fetch that repopulates the next
    /// level (or the verse count, for a poem); "All" needs none.
    pub fn select(&mut self, level: Level, selection: Selection) -> Option<FetchRequest> {
        self.levels[level.index()].selected = selection;
        self.reset_below(level);

        let id = selection.id()?;
        Some(match level.child() {
            Some(child) => FetchRequest::Children { level: child, parent_id: id },
            None => FetchRequest::MaxVerse { poem_id: id },
        })
    }

    /// Replace the option list of `level`; its selection returns to "All"
    /// and every level below is reset
    pub fn replace_options(&mut self, level: Level, options: Vec<SelectOption>) {
        let state = &mut self.levels[level.index()];
        state.options = options;
        state.selected = Selection::All;
        self.reset_below(level);
    }

    pub fn set_max_verse_number(&mut self, max_verse_number: u32) {
        self.max_verse_number = Some(max_verse_number);
    }

    /// Apply a fetch result
    pub fn apply(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Options { level, options } => self.replace_options(level, options),
            FetchOutcome::MaxVerse { max_verse_number, .. } => {
                self.set_max_verse_number(max_verse_number)
            }
        }
    }

    fn reset_below(&mut self, level: Level) {
        for descendant in level.descendants() {
            self.levels[descendant.index()] = LevelState::default();
        }
        self.max_verse_number = None;
    }
}
