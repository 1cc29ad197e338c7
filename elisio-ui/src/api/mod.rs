//! HTTP API client for the Elisio JSON endpoints
//!
//! `CorpusApi` is the read side the selector service depends on; `HttpApi`
//! implements it over reqwest and additionally exposes the batch and admin
//! endpoints as inherent methods.

mod admin;
mod batch;
mod client;
pub mod csrf;

pub use batch::validate_verse_hash;
pub use client::HttpApi;

use async_trait::async_trait;
use elisio_common::models::{
    AuthorRecord, BookRecord, OpusRecord, PoemRecord, ScanResult, VerseMetadata,
};

use crate::error::ApiResult;
use crate::scan::ScanQuery;

/// Read-only corpus endpoints used by the hierarchical selector
///
/// # Example
/// ```rust,ignore
/// use elisio_ui::api::{CorpusApi, HttpApi};
///
/// let api = HttpApi::new(&config)?;
/// for author in api.authors().await? {
///     println!("{} {}", author.pk, author.fields.short_name);
/// }
/// ```
#[async_trait]
pub trait CorpusApi: Send + Sync {
    /// `GET /json/authors/`
    async fn authors(&self) -> ApiResult<Vec<AuthorRecord>>;

    /// `GET /json/author/{id}`: works of an author
    async fn opera(&self, author_id: i64) -> ApiResult<Vec<OpusRecord>>;

    /// `GET /json/opus/{id}`: books of a work
    async fn books(&self, opus_id: i64) -> ApiResult<Vec<BookRecord>>;

    /// `GET /json/book/{id}`: poems of a book
    async fn poems(&self, book_id: i64) -> ApiResult<Vec<PoemRecord>>;

    /// `GET /json/poem/{id}`: highest verse number of a poem
    async fn max_verse_number(&self, poem_id: i64) -> ApiResult<u32>;

    /// `GET /json/verse/{poem}/{verse}`
    async fn verse(&self, poem_id: i64, number: u32) -> ApiResult<VerseMetadata>;

    /// `GET /json/verse/random/`
    async fn random_verse(&self) -> ApiResult<VerseMetadata>;

    /// `GET /json/scan/dbverse/...` or `GET /json/scan/text/...`
    async fn scan(&self, query: &ScanQuery) -> ApiResult<ScanResult>;
}
