//! Scan request dispatcher
//!
//! Builds scan queries for either a stored verse or free text, and keeps the
//! rendered scan output. The server answers with either scanned text plus a
//! zeleny score or an error message; `ScanView` always shows exactly one of
//! the two.

use elisio_common::models::{ScanResult, VerseType};
use tracing::debug;

use crate::api::CorpusApi;
use crate::error::{ApiError, ApiResult};

/// What to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSource {
    /// A verse stored on the server
    Database { poem_id: i64, verse_number: u32 },
    /// Free text typed by the user
    Text(String),
}

/// A complete scan request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanQuery {
    pub source: ScanSource,
    /// Metre to try; `Unknown` lets the server try all
    pub verse_type: VerseType,
    /// Consult the server's word dictionary
    pub dictionary: bool,
}

impl ScanQuery {
    pub fn new(source: ScanSource, verse_type: VerseType, dictionary: bool) -> ApiResult<Self> {
        if let ScanSource::Text(text) = &source {
            if text.trim().is_empty() {
                return Err(ApiError::InvalidInput("verse text is empty".to_string()));
            }
        }
        Ok(Self { source, verse_type, dictionary })
    }

    /// Path below the server root
    pub fn path_segments(&self) -> Vec<String> {
        match &self.source {
            ScanSource::Database { poem_id, verse_number } => vec![
                "json".to_string(),
                "scan".to_string(),
                "dbverse".to_string(),
                poem_id.to_string(),
                verse_number.to_string(),
            ],
            ScanSource::Text(text) => vec![
                "json".to_string(),
                "scan".to_string(),
                "text".to_string(),
                text.trim().to_string(),
            ],
        }
    }

    /// `type=T` plus `disableDict=true` when the dictionary is off
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("type", self.verse_type.as_str().to_string())];
        if !self.dictionary {
            pairs.push(("disableDict", "true".to_string()));
        }
        pairs
    }
}

/// Rendered scan output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanView {
    pub text: Option<String>,
    pub zeleny: Option<Vec<u32>>,
    pub error: Option<String>,
}

impl ScanView {
    /// Render a result, clearing whatever the other variant left behind
    pub fn apply(&mut self, result: &ScanResult) {
        match result {
            ScanResult::Success { text, zeleny } => {
                self.text = Some(text.clone());
                self.zeleny = Some(zeleny.clone());
                self.error = None;
            }
            ScanResult::Failure { message } => {
                self.text = None;
                self.zeleny = None;
                self.error = Some(message.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        *self = ScanView::default();
    }

    /// Zeleny score as shown next to the scan, e.g. `4 3 3 4`
    pub fn zeleny_display(&self) -> Option<String> {
        self.zeleny.as_ref().map(|score| {
            score.iter().map(u32::to_string).collect::<Vec<_>>().join(" ")
        })
    }
}

/// Send one scan request
pub async fn dispatch(api: &dyn CorpusApi, query: &ScanQuery) -> ApiResult<ScanResult> {
    debug!(source = ?query.source, verse_type = %query.verse_type, dictionary = query.dictionary, "Requesting scan");
    let result = api.scan(query).await?;
    if let ScanResult::Failure { message } = &result {
        debug!(%message, "Scan failed on server");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_query() {
        let query = ScanQuery::new(
            ScanSource::Database { poem_id: 12, verse_number: 3 },
            VerseType::Hexameter,
            true,
        )
        .unwrap();
        assert_eq!(query.path_segments(), vec!["json", "scan", "dbverse", "12", "3"]);
        assert_eq!(query.query_pairs(), vec![("type", "HEXAMETER".to_string())]);
    }

    #[test]
    fn test_text_query_without_dictionary() {
        let query = ScanQuery::new(
            ScanSource::Text("  Arma virumque cano ".to_string()),
            VerseType::Unknown,
            false,
        )
        .unwrap();
        assert_eq!(query.path_segments()[3], "Arma virumque cano");
        assert_eq!(
            query.query_pairs(),
            vec![("type", "UNKNOWN".to_string()), ("disableDict", "true".to_string())]
        );
    }

    #[test]
    fn test_empty_text_rejected() {
        let result = ScanQuery::new(ScanSource::Text("   ".to_string()), VerseType::Unknown, true);
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_success_clears_error() {
        let mut view = ScanView { error: Some("old failure".to_string()), ..Default::default() };
        view.apply(&ScanResult::Success { text: "Ārmă".to_string(), zeleny: vec![4, 3] });

        assert_eq!(view.text.as_deref(), Some("Ārmă"));
        assert_eq!(view.zeleny_display().as_deref(), Some("4 3"));
        assert!(view.error.is_none());
    }

    #[test]
    fn test_failure_clears_scan_fields() {
        let mut view = ScanView {
            text: Some("Ārmă".to_string()),
            zeleny: Some(vec![4]),
            error: None,
        };
        view.apply(&ScanResult::Failure { message: "no valid scansion".to_string() });

        assert!(view.text.is_none());
        assert!(view.zeleny.is_none());
        assert_eq!(view.error.as_deref(), Some("no valid scansion"));
    }
}
