//! Verse number input validation and the loaded-verse view

use elisio_common::models::{VerseMetadata, VerseType};
use thiserror::Error;

/// Reasons a typed verse number is refused; the message is shown inline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerseInputError {
    #[error("Insert a number please")]
    NotANumber,

    #[error("Minimum verse number is 1")]
    BelowMinimum,

    #[error("Maximum verse number is {max}")]
    AboveMaximum { max: u32 },

    /// No poem selected, or its verse count has not arrived yet
    #[error("Select a poem first")]
    NoPoemSelected,
}

/// Validate verse-number input against the selected poem's maximum
///
/// Accepts only ASCII digits (surrounding whitespace ignored).
pub fn validate_verse_number(
    input: &str,
    max_verse_number: Option<u32>,
) -> Result<u32, VerseInputError> {
    let input = input.trim();
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VerseInputError::NotANumber);
    }

    // Digits only, so the only parse failure is overflow
    let number = input.parse::<u64>().unwrap_or(u64::MAX);
    if number == 0 {
        return Err(VerseInputError::BelowMinimum);
    }

    let max = max_verse_number.ok_or(VerseInputError::NoPoemSelected)?;
    if number > u64::from(max) {
        return Err(VerseInputError::AboveMaximum { max });
    }

    Ok(number as u32)
}

/// Verse currently shown under the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseView {
    pub poem_id: i64,
    pub number: u32,
    pub text: String,
    pub verse_type: VerseType,
}

impl VerseView {
    pub fn from_metadata(poem_id: i64, metadata: &VerseMetadata) -> Self {
        Self {
            poem_id,
            number: metadata.verse.number,
            text: metadata.verse.text.clone(),
            verse_type: metadata.verse.verse_type,
        }
    }
}
