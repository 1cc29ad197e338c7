//! Batch criterion builder
//!
//! Each criterion row mirrors the four selection fields plus an optional
//! relation qualifier. A row selects the most specific level that is not
//! "All", reading from the author down and stopping at the first "All".

use elisio_common::models::{Criterion, CriterionScope, Level, Relation, Selection};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::api::HttpApi;
use crate::error::{ApiError, ApiResult};
use crate::selector::SelectionState;

/// One row of the batch form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriterionRow {
    pub author: Selection,
    pub opus: Selection,
    pub book: Selection,
    pub poem: Selection,
    pub relation: Option<Relation>,
    /// Relation control shown; a hidden relation is never sent
    pub relation_visible: bool,
}

impl CriterionRow {
    pub fn selected(&self, level: Level) -> Selection {
        match level {
            Level::Author => self.author,
            Level::Opus => self.opus,
            Level::Book => self.book,
            Level::Poem => self.poem,
        }
    }

    /// Deepest specific selection above the first "All"
    pub fn scope(&self) -> CriterionScope {
        let mut scope = CriterionScope::All;
        for level in Level::ALL {
            match self.selected(level) {
                Selection::All => break,
                Selection::Id(id) => scope = CriterionScope::at(level, id),
            }
        }
        scope
    }

    pub fn criterion(&self) -> Criterion {
        Criterion {
            scope: self.scope(),
            relation: self.relation.clone().filter(|_| self.relation_visible),
        }
    }
}

impl From<&SelectionState> for CriterionRow {
    fn from(selection: &SelectionState) -> Self {
        CriterionRow {
            author: selection.selected(Level::Author),
            opus: selection.selected(Level::Opus),
            book: selection.selected(Level::Book),
            poem: selection.selected(Level::Poem),
            relation: None,
            relation_visible: false,
        }
    }
}

/// `author/opus/book/poem[@relation]`, each part `all` or an id
///
/// Trailing parts may be left out and read as `all`.
impl FromStr for CriterionRow {
    type Err = ApiError;

    fn from_str(s: &str) -> ApiResult<Self> {
        let (path, relation) = match s.split_once('@') {
            Some((path, relation)) => (path, Some(Relation::from(relation.trim()))),
            None => (s, None),
        };

        let parts: Vec<&str> = path.trim().split('/').collect();
        if parts.len() > Level::ALL.len() {
            return Err(ApiError::InvalidInput(format!(
                "criterion '{}' has more than {} levels",
                s,
                Level::ALL.len()
            )));
        }

        let mut selections = [Selection::All; 4];
        for (slot, part) in selections.iter_mut().zip(&parts) {
            *slot = part.trim().parse::<Selection>().map_err(|e| {
                ApiError::InvalidInput(format!("criterion '{}': {}", s, e))
            })?;
        }
        let [author, opus, book, poem] = selections;

        Ok(CriterionRow {
            author,
            opus,
            book,
            poem,
            relation_visible: relation.is_some(),
            relation,
        })
    }
}

impl fmt::Display for CriterionRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.author, self.opus, self.book, self.poem)?;
        match &self.relation {
            Some(relation) if self.relation_visible => write!(f, "@{}", relation.as_str()),
            _ => Ok(()),
        }
    }
}

/// Ordered criterion rows submitted together
#[derive(Debug, Clone, Default)]
pub struct BatchBuilder {
    rows: Vec<CriterionRow>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: CriterionRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[CriterionRow] {
        &self.rows
    }

    /// Criteria in row order
    pub fn criteria(&self) -> Vec<Criterion> {
        self.rows.iter().map(CriterionRow::criterion).collect()
    }

    /// Send every row as one batch-item save request
    pub async fn submit(&self, api: &HttpApi) -> ApiResult<usize> {
        if self.rows.is_empty() {
            return Err(ApiError::InvalidInput("no criteria to save".to_string()));
        }
        let criteria = self.criteria();
        api.save_batch_items(&criteria).await?;
        info!(count = criteria.len(), "Saved batch criteria");
        Ok(criteria.len())
    }
}

impl FromIterator<CriterionRow> for BatchBuilder {
    fn from_iter<I: IntoIterator<Item = CriterionRow>>(iter: I) -> Self {
        Self { rows: iter.into_iter().collect() }
    }
}
