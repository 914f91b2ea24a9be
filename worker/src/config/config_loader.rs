use std::path::PathBuf;

use anyhow::{Context, Result};
use backend::config::{
    config_loader::{get_stage, load_mercado_pago, load_subscription, optional, parse_or, required},
    config_model::Database,
};
use crates::infra::{mailer::http_mailer::HttpMailerConfig, storages::s3::S3Config};

use super::config_model::{BackupConfig, BackupUpload, DotEnvyConfig, Outbox, Sweeps, WorkerServer};

pub const DEFAULT_BACKUP_RETENTION_DAYS: i64 = 7;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: required("SERVER_PORT_WORKER")?
            .parse()
            .context("SERVER_PORT_WORKER is invalid")?,
        body_limit: parse_or("SERVER_BODY_LIMIT", 10)?,
        timeout: parse_or("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let mailer = HttpMailerConfig {
        api_url: required("MAILER_API_URL")?,
        api_key: required("MAILER_API_KEY")?,
        from: required("MAILER_FROM")?,
    };

    Ok(DotEnvyConfig {
        stage: get_stage(),
        worker_server,
        database,
        sweeps: Sweeps {
            internal_token: optional("INTERNAL_SWEEP_TOKEN"),
        },
        mercado_pago: load_mercado_pago()?,
        subscription: load_subscription()?,
        mailer,
        outbox: load_outbox()?,
    })
}

pub fn load_outbox() -> Result<Outbox> {
    let defaults = Outbox::default();
    let outbox = Outbox {
        poll_interval_secs: parse_or("OUTBOX_POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
        batch_size: parse_or("OUTBOX_BATCH_SIZE", defaults.batch_size)?,
        max_attempts: parse_or("OUTBOX_MAX_ATTEMPTS", defaults.max_attempts)?,
        backoff_base_secs: parse_or("OUTBOX_BACKOFF_BASE_SECS", defaults.backoff_base_secs)?,
        claim_lease_secs: parse_or("OUTBOX_CLAIM_LEASE_SECS", defaults.claim_lease_secs)?,
    };
    check_outbox(&outbox)?;
    Ok(outbox)
}

fn check_outbox(outbox: &Outbox) -> Result<()> {
    if outbox.poll_interval_secs == 0 {
        anyhow::bail!("OUTBOX_POLL_INTERVAL_SECS must be positive");
    }
    if outbox.batch_size <= 0 {
        anyhow::bail!("OUTBOX_BATCH_SIZE must be positive");
    }
    if outbox.max_attempts <= 0 {
        anyhow::bail!("OUTBOX_MAX_ATTEMPTS must be positive");
    }
    if outbox.backoff_base_secs < 0 {
        anyhow::bail!("OUTBOX_BACKOFF_BASE_SECS must not be negative");
    }
    if outbox.claim_lease_secs <= 0 {
        anyhow::bail!("OUTBOX_CLAIM_LEASE_SECS must be positive");
    }
    Ok(())
}

pub fn load_backup() -> Result<BackupConfig> {
    dotenvy::dotenv().ok();

    let s3 = match optional("BACKUP_S3_BUCKET") {
        Some(bucket) => Some(BackupUpload {
            storage: S3Config::new(
                required("BACKUP_S3_ENDPOINT")?,
                optional("BACKUP_S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                bucket,
                required("BACKUP_S3_ACCESS_KEY_ID")?,
                required("BACKUP_S3_SECRET_ACCESS_KEY")?,
            ),
            prefix: optional("BACKUP_S3_PREFIX").unwrap_or_else(|| "backups".to_string()),
        }),
        None => None,
    };

    let retention_days = parse_or("BACKUP_RETENTION_DAYS", DEFAULT_BACKUP_RETENTION_DAYS)?;
    if retention_days < 0 {
        anyhow::bail!("BACKUP_RETENTION_DAYS must not be negative");
    }

    Ok(BackupConfig {
        database_url: required("DATABASE_URL")?,
        backup_dir: PathBuf::from(optional("BACKUP_DIR").unwrap_or_else(|| "./backups".to_string())),
        retention_days,
        s3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_outbox_settings_are_valid() {
        assert!(check_outbox(&Outbox::default()).is_ok());
    }

    #[test]
    fn rejects_non_positive_outbox_settings() {
        let zero_batch = Outbox {
            batch_size: 0,
            ..Outbox::default()
        };
        assert!(check_outbox(&zero_batch).is_err());

        let no_attempts = Outbox {
            max_attempts: 0,
            ..Outbox::default()
        };
        assert!(check_outbox(&no_attempts).is_err());

        let no_wait = Outbox {
            backoff_base_secs: 0,
            ..Outbox::default()
        };
        assert!(check_outbox(&no_wait).is_ok());

        let no_lease = Outbox {
            claim_lease_secs: 0,
            ..Outbox::default()
        };
        assert!(check_outbox(&no_lease).is_err());
    }
}
