//! Corpus entities and JSON wire types shared by the Elisio client crates
//!
//! The server serializes list endpoints as Django records
//! (`{"model": ..., "pk": ..., "fields": {...}}`); single-verse endpoints use a
//! nested metadata object. Types here mirror those shapes so `serde` can decode
//! responses directly.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

// ========================================
// Selection Hierarchy
// ========================================

/// One level of the author → opus → book → poem hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Author,
    Opus,
    Book,
    Poem,
}

impl Level {
    /// All levels in descent order
    pub const ALL: [Level; 4] = [Level::Author, Level::Opus, Level::Book, Level::Poem];

    /// Position in descent order (author = 0)
    pub fn index(self) -> usize {
        match self {
            Level::Author => 0,
            Level::Opus => 1,
            Level::Book => 2,
            Level::Poem => 3,
        }
    }

    /// Next level down, `None` below poem
    pub fn child(self) -> Option<Level> {
        Level::ALL.get(self.index() + 1).copied()
    }

    /// Levels strictly below this one, nearest first
    pub fn descendants(self) -> &'static [Level] {
        &Level::ALL[self.index() + 1..]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Author => "author",
            Level::Opus => "opus",
            Level::Book => "book",
            Level::Poem => "poem",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Current value of one selection field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// The "All" entry, always present at the top of each option list
    #[default]
    All,
    /// A specific entity by primary key
    Id(i64),
}

impl Selection {
    pub fn is_all(self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn id(self) -> Option<i64> {
        match self {
            Selection::All => None,
            Selection::Id(id) => Some(id),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Id(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Selection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s.is_empty() {
            return Ok(Selection::All);
        }
        s.parse::<i64>()
            .map(Selection::Id)
            .map_err(|_| Error::InvalidInput(format!("expected 'all' or an id, got '{}'", s)))
    }
}

/// One entry of a level's option list (the implicit "All" entry is not stored)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: i64,
    pub label: String,
}

/// Fully specified position in the hierarchy, as carried by verse metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyPath {
    pub author: i64,
    pub opus: i64,
    pub book: i64,
    pub poem: i64,
}

impl HierarchyPath {
    /// Target id for the given level
    pub fn id_at(&self, level: Level) -> i64 {
        match level {
            Level::Author => self.author,
            Level::Opus => self.opus,
            Level::Book => self.book,
            Level::Poem => self.poem,
        }
    }
}

// ========================================
// Serialized Records
// ========================================

/// Django serializer record: `{"model": "...", "pk": 1, "fields": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<F> {
    pub pk: i64,
    pub fields: F,
}

/// Fields of an author record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorFields {
    pub short_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Fields of an opus record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpusFields {
    pub full_name: String,
}

/// Fields of book and poem records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberFields {
    pub number: i64,
}

/// Fields of a member record returned by the admin user list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberFields {
    pub username: String,
    #[serde(default)]
    pub date_joined: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_active: bool,
}

pub type AuthorRecord = Record<AuthorFields>;
pub type OpusRecord = Record<OpusFields>;
pub type BookRecord = Record<NumberFields>;
pub type PoemRecord = Record<NumberFields>;
pub type MemberRecord = Record<MemberFields>;

impl From<&AuthorRecord> for SelectOption {
    fn from(record: &AuthorRecord) -> Self {
        SelectOption { id: record.pk, label: record.fields.short_name.clone() }
    }
}

impl From<&OpusRecord> for SelectOption {
    fn from(record: &OpusRecord) -> Self {
        SelectOption { id: record.pk, label: record.fields.full_name.clone() }
    }
}

impl From<&Record<NumberFields>> for SelectOption {
    fn from(record: &Record<NumberFields>) -> Self {
        SelectOption { id: record.pk, label: record.fields.number.to_string() }
    }
}

// ========================================
// Verses
// ========================================

/// Metrical type tag of a verse
///
/// Unrecognized tags decode as `Unknown`, which lets the server pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerseType {
    Hexameter,
    Pentameter,
    Hendecasyllabus,
    #[default]
    #[serde(other)]
    Unknown,
}

impl VerseType {
    /// Name used in the `type` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            VerseType::Unknown => "UNKNOWN",
            VerseType::Hexameter => "HEXAMETER",
            VerseType::Pentameter => "PENTAMETER",
            VerseType::Hendecasyllabus => "HENDECASYLLABUS",
        }
    }
}

impl fmt::Display for VerseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" | "" => Ok(VerseType::Unknown),
            "HEXAMETER" => Ok(VerseType::Hexameter),
            "PENTAMETER" => Ok(VerseType::Pentameter),
            "HENDECASYLLABUS" => Ok(VerseType::Hendecasyllabus),
            other => Err(Error::InvalidInput(format!("unknown verse type '{}'", other))),
        }
    }
}

/// Verse body of a metadata response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseDetail {
    pub text: String,
    pub number: u32,
    #[serde(rename = "type", default)]
    pub verse_type: VerseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Reference to an ancestor in verse metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response of `/json/verse/{poem}/{verse}` and `/json/verse/random/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseMetadata {
    pub verse: VerseDetail,
    #[serde(default)]
    pub author: Option<MetadataRef>,
    #[serde(default)]
    pub opus: Option<MetadataRef>,
    #[serde(default)]
    pub book: Option<MetadataRef>,
    #[serde(default)]
    pub poem: Option<MetadataRef>,
}

impl VerseMetadata {
    /// Hierarchy position, present only when all four ancestors are given
    pub fn path(&self) -> Option<HierarchyPath> {
        Some(HierarchyPath {
            author: self.author.as_ref()?.id,
            opus: self.opus.as_ref()?.id,
            book: self.book.as_ref()?.id,
            poem: self.poem.as_ref()?.id,
        })
    }
}

// ========================================
// Scan Results
// ========================================

/// Raw body of the scan endpoints: `{text, zeleny}` or `{error}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub zeleny: Option<Vec<u32>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of a scan request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ScanResult {
    /// Scanned text with its zeleny stress-interval score
    Success { text: String, zeleny: Vec<u32> },
    /// Scansion failed on the server
    Failure { message: String },
}

impl From<ScanResponse> for ScanResult {
    fn from(response: ScanResponse) -> Self {
        match response.text {
            Some(text) if !text.is_empty() => ScanResult::Success {
                text,
                zeleny: response.zeleny.unwrap_or_default(),
            },
            _ => ScanResult::Failure {
                message: response.error.unwrap_or_default(),
            },
        }
    }
}

// ========================================
// Batch Criteria
// ========================================

/// Scope selected by one batch criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriterionScope {
    All,
    Author(i64),
    Opus(i64),
    Book(i64),
    Poem(i64),
}

impl CriterionScope {
    /// Scoped form of a selection at the given level
    pub fn at(level: Level, id: i64) -> Self {
        match level {
            Level::Author => CriterionScope::Author(id),
            Level::Opus => CriterionScope::Opus(id),
            Level::Book => CriterionScope::Book(id),
            Level::Poem => CriterionScope::Poem(id),
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            CriterionScope::All => "all",
            CriterionScope::Author(_) => "author",
            CriterionScope::Opus(_) => "opus",
            CriterionScope::Book(_) => "book",
            CriterionScope::Poem(_) => "poem",
        }
    }

    /// Wire id; `all` is sent as 0
    pub fn id(self) -> i64 {
        match self {
            CriterionScope::All => 0,
            CriterionScope::Author(id)
            | CriterionScope::Opus(id)
            | CriterionScope::Book(id)
            | CriterionScope::Poem(id) => id,
        }
    }
}

/// Relation qualifier of a criterion, passed through to the server untouched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relation(pub String);

impl Relation {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Relation {
    fn from(value: &str) -> Self {
        Relation(value.to_string())
    }
}

/// One entry of the list posted to `/json/batchitem/save/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "CriterionWire", try_from = "CriterionWire")]
pub struct Criterion {
    pub scope: CriterionScope,
    pub relation: Option<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CriterionWire {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relation: Option<Relation>,
}

impl From<Criterion> for CriterionWire {
    fn from(criterion: Criterion) -> Self {
        CriterionWire {
            kind: criterion.scope.type_name().to_string(),
            id: criterion.scope.id(),
            relation: criterion.relation,
        }
    }
}

impl TryFrom<CriterionWire> for Criterion {
    type Error = Error;

    fn try_from(wire: CriterionWire) -> Result<Self> {
        let scope = match wire.kind.as_str() {
            "all" => CriterionScope::All,
            "author" => CriterionScope::Author(wire.id),
            "opus" => CriterionScope::Opus(wire.id),
            "book" => CriterionScope::Book(wire.id),
            "poem" => CriterionScope::Poem(wire.id),
            other => {
                return Err(Error::InvalidInput(format!("unknown criterion type '{}'", other)))
            }
        };
        Ok(Criterion { scope, relation: wire.relation })
    }
}

// ========================================
// Batches
// ========================================

/// Scan coverage of a saved batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCoverage {
    pub number: u32,
    pub recent: String,
}

/// Entry of `/json/batches/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub id: i64,
    pub name: String,
    pub timing: String,
    #[serde(default)]
    pub items_at_creation: Option<i64>,
    pub items_now: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scans: Option<ScanCoverage>,
}

impl BatchSummary {
    /// Creation time parsed from the server's `YYYY-MM-DD HH:MM:SS[.ffffff]+HH:MM` form
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_str(&self.timing, "%Y-%m-%d %H:%M:%S%.f%:z")
            .or_else(|_| DateTime::parse_from_rfc3339(&self.timing))
            .ok()
    }
}

// ========================================
// Admin Metadata
// ========================================

/// New author posted to `/json/admin/meta/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuthor {
    pub full_name: String,
    pub short_name: String,
    pub abbreviation: String,
    pub period: i64,
    pub birth_year: i32,
    pub dying_year: i32,
    pub floruit_start: i32,
    pub floruit_end: i32,
}

/// New opus posted to `/json/admin/meta/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOpus {
    pub full_name: String,
    pub abbreviation: String,
    pub alternative_name: String,
    pub author: i64,
    pub publication: i32,
    pub genre: i64,
}

/// Metadata form body; the server tells the kinds apart by the `period` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NewMetadata {
    Author(NewAuthor),
    Opus(NewOpus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_descendants() {
        assert_eq!(Level::Author.descendants(), &[Level::Opus, Level::Book, Level::Poem]);
        assert_eq!(Level::Book.descendants(), &[Level::Poem]);
        assert!(Level::Poem.descendants().is_empty());
        assert_eq!(Level::Poem.child(), None);
        assert_eq!(Level::Opus.child(), Some(Level::Book));
    }

    #[test]
    fn test_selection_from_str() {
        assert_eq!("all".parse::<Selection>().unwrap(), Selection::All);
        assert_eq!("ALL".parse::<Selection>().unwrap(), Selection::All);
        assert_eq!(" 42 ".parse::<Selection>().unwrap(), Selection::Id(42));
        assert!("forty".parse::<Selection>().is_err());
    }

    #[test]
    fn test_criterion_wire_format() {
        let all = Criterion { scope: CriterionScope::All, relation: None };
        assert_eq!(serde_json::to_value(&all).unwrap(), json!({"type": "all", "id": 0}));

        let opus = Criterion {
            scope: CriterionScope::Opus(7),
            relation: Some(Relation::from("except")),
        };
        assert_eq!(
            serde_json::to_value(&opus).unwrap(),
            json!({"type": "opus", "id": 7, "relation": "except"})
        );
    }

    #[test]
    fn test_criterion_rejects_unknown_type() {
        let result: std::result::Result<Criterion, _> =
            serde_json::from_value(json!({"type": "verse", "id": 3}));
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_response_success_and_failure() {
        let ok: ScanResponse =
            serde_json::from_value(json!({"text": "Ārmă vĭ", "zeleny": [4, 3, 3]})).unwrap();
        assert_eq!(
            ScanResult::from(ok),
            ScanResult::Success { text: "Ārmă vĭ".to_string(), zeleny: vec![4, 3, 3] }
        );

        let failed: ScanResponse =
            serde_json::from_value(json!({"error": "no valid scansion"})).unwrap();
        assert_eq!(
            ScanResult::from(failed),
            ScanResult::Failure { message: "no valid scansion".to_string() }
        );

        // Empty text counts as failure
        let empty: ScanResponse = serde_json::from_value(json!({"text": "", "error": "x"})).unwrap();
        assert!(matches!(ScanResult::from(empty), ScanResult::Failure { .. }));
    }

    #[test]
    fn test_verse_metadata_decoding() {
        let body = json!({
            "verse": {"text": "Arma virumque cano", "number": 1, "id": 9, "type": "HEXAMETER"},
            "poem": {"id": 1000, "number": 1},
            "book": {"id": 100, "number": "I"},
            "opus": {"id": 10, "name": "Aeneis"},
            "author": {"id": 1, "name": "Vergilius"}
        });
        let metadata: VerseMetadata = serde_json::from_value(body).unwrap();
        assert_eq!(metadata.verse.verse_type, VerseType::Hexameter);
        assert_eq!(
            metadata.path(),
            Some(HierarchyPath { author: 1, opus: 10, book: 100, poem: 1000 })
        );
    }

    #[test]
    fn test_unknown_verse_type_decodes_as_unknown() {
        let detail: VerseDetail =
            serde_json::from_value(json!({"text": "x", "number": 2, "type": "SAPPHIC"})).unwrap();
        assert_eq!(detail.verse_type, VerseType::Unknown);
    }

    #[test]
    fn test_batch_summary_timing() {
        let batch: BatchSummary = serde_json::from_value(json!({
            "id": 4,
            "name": "marcus12",
            "timing": "2021-03-04 10:11:12.345678+00:00",
            "itemsAtCreation": 12,
            "itemsNow": 10
        }))
        .unwrap();
        assert!(batch.scans.is_none());
        assert!(batch.created_at().is_some());
    }

    #[test]
    fn test_new_metadata_form_shape() {
        let opus = NewMetadata::Opus(NewOpus {
            full_name: "Tristia".to_string(),
            abbreviation: "Tr".to_string(),
            alternative_name: String::new(),
            author: 2,
            publication: 12,
            genre: 1,
        });
        let value = serde_json::to_value(&opus).unwrap();
        assert_eq!(value["author"], 2);
        assert!(value.get("period").is_none());
    }
}
