//! Admin endpoints (superuser sessions only)

use elisio_common::models::{MemberRecord, NewMetadata};
use tracing::info;

use super::HttpApi;
use crate::error::ApiResult;

impl HttpApi {
    /// `GET /json/admin/sync/files/`: reload corpus text files on the server
    pub async fn sync_files(&self) -> ApiResult<()> {
        self.get_empty(self.endpoint(&["json", "admin", "sync", "files", ""])?)
            .await?;
        info!("done syncing files");
        Ok(())
    }

    /// `GET /json/admin/sync/db/`
    pub async fn sync_db(&self) -> ApiResult<()> {
        self.get_empty(self.endpoint(&["json", "admin", "sync", "db", ""])?)
            .await?;
        info!("done syncing db");
        Ok(())
    }

    /// `GET /json/admin/users/`
    pub async fn members(&self) -> ApiResult<Vec<MemberRecord>> {
        self.get_json(self.endpoint(&["json", "admin", "users", ""])?).await
    }

    /// `POST /json/admin/meta/` as a form body
    pub async fn post_metadata(&self, metadata: &NewMetadata) -> ApiResult<()> {
        let url = self.endpoint(&["json", "admin", "meta", ""])?;
        self.send_mutating(self.post(url.clone()).form(metadata), &url).await?;
        info!("new metadata item created");
        Ok(())
    }
}
