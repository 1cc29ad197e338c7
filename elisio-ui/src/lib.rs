//! elisio-ui library
//!
//! Client side of the Elisio verse-scansion server: the hierarchical
//! author/opus/book/poem/verse selector, scan requests, and the batch
//! criterion builder, all over the server's JSON endpoints.

pub mod api;
pub mod batch;
pub mod error;
pub mod scan;
pub mod selector;
pub mod state;
pub mod verse;

pub use api::{CorpusApi, HttpApi};
pub use error::{ApiError, ApiResult, UiError, UiResult};
pub use selector::{spawn_selector, Outcome, ScanTarget, SelectorHandle};
pub use state::UiState;
