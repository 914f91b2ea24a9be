use std::path::PathBuf;

use backend::config::{
    config_model::{Database, MercadoPago, Subscription},
    stage::Stage,
};
use crates::infra::{mailer::http_mailer::HttpMailerConfig, storages::s3::S3Config};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub worker_server: WorkerServer,
    pub database: Database,
    pub sweeps: Sweeps,
    pub mercado_pago: MercadoPago,
    pub subscription: Subscription,
    pub mailer: HttpMailerConfig,
    pub outbox: Outbox,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Sweeps {
    pub internal_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outbox {
    pub poll_interval_secs: u64,
    pub batch_size: i64,
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
    /// A `sending` row older than this is treated as abandoned and claimed again.
    pub claim_lease_secs: i64,
}

impl Default for Outbox {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            batch_size: 20,
            max_attempts: 5,
            backoff_base_secs: 30,
            claim_lease_secs: 300,
        }
    }
}

/// Settings of the `db_backup` binary.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub database_url: String,
    pub backup_dir: PathBuf,
    pub retention_days: i64,
    pub s3: Option<BackupUpload>,
}

#[derive(Debug, Clone)]
pub struct BackupUpload {
    pub storage: S3Config,
    pub prefix: String,
}
