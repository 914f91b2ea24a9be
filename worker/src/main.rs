use anyhow::Result;
use crates::infra::{
    db::{postgres::postgres_connection, repositories::notification_outbox::NotificationOutboxPostgres},
    mailer::http_mailer::HttpMailer,
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{axum_http, config, services::outbox_worker::OutboxWorker};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let outbox_worker = Arc::new(OutboxWorker::new(
        Arc::new(NotificationOutboxPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(HttpMailer::new(dotenvy_env.mailer.clone())),
        dotenvy_env.outbox,
    ));
    let outbox_loop = tokio::spawn(outbox_worker.run());

    let server_config = Arc::clone(&dotenvy_env);
    let sweep_server = tokio::spawn(async move {
        axum_http::http_serve::start(server_config, db_pool_arc).await
    });

    // The server returns after a shutdown signal; the outbox loop only on error.
    tokio::select! {
        result = outbox_loop => result??,
        result = sweep_server => result??,
    };
    Ok(())
}
