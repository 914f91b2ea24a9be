use anyhow::Result;
use chrono::Utc;
use crates::infra::storages::s3::S3BackupStorage;
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    config::config_loader,
    usecases::database_backup::{BackupSettings, DatabaseBackupUseCase, PgDump},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Database backup failed: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("db_backup")?;

    let backup_config = config_loader::load_backup()?;
    info!(
        backup_dir = %backup_config.backup_dir.display(),
        retention_days = backup_config.retention_days,
        upload = backup_config.s3.is_some(),
        "ENV has been loaded"
    );

    let (storage, object_prefix) = match backup_config.s3 {
        Some(upload) => (
            Some(Arc::new(S3BackupStorage::new(upload.storage).await?)),
            upload.prefix,
        ),
        None => (None, String::new()),
    };

    let usecase = DatabaseBackupUseCase::new(
        Arc::new(PgDump),
        storage,
        BackupSettings {
            database_url: backup_config.database_url,
            backup_dir: backup_config.backup_dir,
            retention_days: backup_config.retention_days,
            object_prefix,
        },
    );

    let report = usecase.run(Utc::now()).await?;
    info!(file = %report.file.display(), "Database backup completed");

    Ok(())
}
