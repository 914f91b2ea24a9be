use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use crates::{
    domain::repositories::backup_storage::BackupStorage,
    infra::storages::s3::StorageUploadError,
    retry::{RetryOptions, with_retry},
};
use mockall::automock;
use tokio::{fs, process::Command};
use tracing::{error, info, warn};

const FILE_PREFIX: &str = "backup-";
const FILE_SUFFIX: &str = ".sql";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[automock]
#[async_trait]
pub trait DatabaseDumper {
    async fn dump(&self, database_url: &str, output: &Path) -> Result<()>;
}

/// Plain SQL dump through the `pg_dump` executable on `PATH`.
pub struct PgDump;

#[async_trait]
impl DatabaseDumper for PgDump {
    async fn dump(&self, database_url: &str, output: &Path) -> Result<()> {
        let output_status = Command::new("pg_dump")
            .arg("--no-owner")
            .arg("--no-privileges")
            .arg("--file")
            .arg(output)
            .arg("--dbname")
            .arg(database_url)
            .output()
            .await
            .context("failed to run pg_dump")?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            error!(
                status = %output_status.status,
                stderr = %stderr,
                "backup: pg_dump failed"
            );
            bail!("pg_dump exited with {}", output_status.status);
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BackupSettings {
    pub database_url: String,
    pub backup_dir: PathBuf,
    pub retention_days: i64,
    pub object_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub file: PathBuf,
    pub uploaded_key: Option<String>,
    pub removed: Vec<PathBuf>,
}

pub struct DatabaseBackupUseCase<D, S>
where
    D: DatabaseDumper + Send + Sync + 'static,
    S: BackupStorage + Send + Sync + 'static,
{
    dumper: Arc<D>,
    storage: Option<Arc<S>>,
    settings: BackupSettings,
    upload_retry: RetryOptions,
}

impl<D, S> DatabaseBackupUseCase<D, S>
where
    D: DatabaseDumper + Send + Sync + 'static,
    S: BackupStorage + Send + Sync + 'static,
{
    pub fn new(dumper: Arc<D>, storage: Option<Arc<S>>, settings: BackupSettings) -> Self {
        Self {
            dumper,
            storage,
            settings,
            upload_retry: RetryOptions::new()
                .with_initial_delay(Duration::from_secs(2))
                .with_should_retry(StorageUploadError::is_retryable_error),
        }
    }

    #[must_use]
    pub fn with_upload_retry(mut self, options: RetryOptions) -> Self {
        self.upload_retry = options;
        self
    }

    /// Dumps, uploads when storage is configured, then prunes old local
    /// dumps. A failed upload leaves every local dump in place.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<BackupReport> {
        fs::create_dir_all(&self.settings.backup_dir)
            .await
            .with_context(|| {
                format!("failed to create {}", self.settings.backup_dir.display())
            })?;

        let file_name = backup_file_name(now);
        let file = self.settings.backup_dir.join(&file_name);

        info!(file = %file.display(), "backup: dumping database");
        if let Err(err) = self.dumper.dump(&self.settings.database_url, &file).await {
            if let Err(remove_err) = fs::remove_file(&file).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(file = %file.display(), error = ?remove_err, "backup: failed to remove partial dump");
                }
            }
            return Err(err);
        }

        let uploaded_key = match &self.storage {
            Some(storage) => Some(self.upload(storage, &file, &file_name).await?),
            None => {
                info!("backup: no bucket configured, keeping the dump local only");
                None
            }
        };

        let removed = self.prune(now, &file).await?;

        info!(
            file = %file.display(),
            uploaded_key = ?uploaded_key,
            removed = removed.len(),
            "backup: finished"
        );

        Ok(BackupReport {
            file,
            uploaded_key,
            removed,
        })
    }

    async fn upload(&self, storage: &Arc<S>, file: &Path, file_name: &str) -> Result<String> {
        let object_key = object_key(&self.settings.object_prefix, file_name);

        with_retry(&self.upload_retry, || {
            let storage = Arc::clone(storage);
            let file = file.to_path_buf();
            let object_key = object_key.clone();
            async move { storage.upload_backup(file, object_key).await }
        })
        .await
        .with_context(|| format!("failed to upload {}", file.display()))
    }

    async fn prune(&self, now: DateTime<Utc>, keep: &Path) -> Result<Vec<PathBuf>> {
        let cutoff = now - chrono::Duration::days(self.settings.retention_days);
        let mut removed = Vec::new();

        let mut entries = fs::read_dir(&self.settings.backup_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == keep {
                continue;
            }
            let Some(taken_at) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(backup_taken_at)
            else {
                continue;
            };
            if taken_at >= cutoff {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => removed.push(path),
                Err(err) => {
                    warn!(file = %path.display(), error = ?err, "backup: failed to remove expired dump")
                }
            }
        }

        removed.sort();
        Ok(removed)
    }
}

pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!("{FILE_PREFIX}{}{FILE_SUFFIX}", now.format(TIMESTAMP_FORMAT))
}

/// Timestamp encoded in a `backup-YYYYmmdd-HHMMSS.sql` name.
pub fn backup_taken_at(file_name: &str) -> Option<DateTime<Utc>> {
    let stamp = file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|taken_at| taken_at.and_utc())
}

pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}
