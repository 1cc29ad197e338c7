//! Batch endpoints
//!
//! Batches belong to the logged-in session user; the server answers 403 for
//! anonymous sessions and 401 when deleting someone else's batch.

use elisio_common::models::{BatchSummary, Criterion};
use tracing::{debug, info};

use super::HttpApi;
use crate::error::{ApiError, ApiResult};

/// Check a pending-verse hash: 64 lowercase hex characters
pub fn validate_verse_hash(hash: &str) -> ApiResult<()> {
    let valid = hash.len() == 64
        && hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!("'{}' is not a verse hash", hash)))
    }
}

impl HttpApi {
    /// `POST /json/batchitem/save/` with the ordered criterion list
    pub async fn save_batch_items(&self, criteria: &[Criterion]) -> ApiResult<()> {
        let url = self.endpoint(&["json", "batchitem", "save", ""])?;
        debug!(count = criteria.len(), "Saving batch criteria");
        self.send_mutating(self.post(url.clone()).json(criteria), &url).await?;
        Ok(())
    }

    /// `POST /json/batch/save/`: turn the session's pending items into a batch
    pub async fn save_batch(&self) -> ApiResult<()> {
        let url = self.endpoint(&["json", "batch", "save", ""])?;
        self.send_mutating(self.post(url.clone()), &url).await?;
        info!("Saved current session as batch");
        Ok(())
    }

    /// `GET /json/batches/`
    pub async fn batches(&self) -> ApiResult<Vec<BatchSummary>> {
        self.get_json(self.endpoint(&["json", "batches", ""])?).await
    }

    /// `DELETE /json/batch/delete/{id}`
    pub async fn delete_batch(&self, batch_id: i64) -> ApiResult<()> {
        let id = batch_id.to_string();
        let url = self.endpoint(&["json", "batch", "delete", &id])?;
        self.send_mutating(self.delete(url.clone()), &url).await?;
        info!(batch_id, "Deleted batch");
        Ok(())
    }

    /// `POST /json/batch/run/{id}`
    pub async fn run_batch(&self, batch_id: i64) -> ApiResult<()> {
        let id = batch_id.to_string();
        let url = self.endpoint(&["json", "batch", "run", &id])?;
        self.send_mutating(self.post(url.clone()), &url).await?;
        info!(batch_id, "Started batch run");
        Ok(())
    }

    /// `GET /json/batch/clearcurrentsession`
    pub async fn clear_current_session(&self) -> ApiResult<()> {
        self.get_empty(self.endpoint(&["json", "batch", "clearcurrentsession"])?)
            .await
    }

    /// `GET /json/batch/deleteverse/{hash}`
    pub async fn delete_session_verse(&self, hash: &str) -> ApiResult<()> {
        validate_verse_hash(hash)?;
        self.get_empty(self.endpoint(&["json", "batch", "deleteverse", hash])?)
            .await
    }
}
