use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// Off-site destination for database dumps.
#[automock]
#[async_trait]
pub trait BackupStorage {
    /// Returns the object key the file was stored under.
    async fn upload_backup(&self, local_path: PathBuf, object_key: String) -> Result<String>;
}
