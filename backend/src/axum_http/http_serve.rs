use crate::{
    auth::{self, IdentityResolution, IdentityResolver, identity_resolver::verifier_chain},
    axum_http::{
        audit, default_routers,
        routers::{
            self,
            listings::{self, BlogPosts, Businesses, JobApplications, Jobs, Professionals, Reviews},
        },
    },
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use crates::{
    identity::revocation::InMemoryRevocationStore,
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            blog_posts::BlogPostPostgres, businesses::BusinessPostgres,
            job_applications::JobApplicationPostgres, jobs::JobPostgres,
            notification_outbox::NotificationOutboxPostgres, professionals::ProfessionalPostgres,
            reviews::ReviewPostgres, users::UserPostgres,
        },
    },
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub fn identity_resolver(
    config: &DotEnvyConfig,
    db_pool: Arc<PgPoolSquad>,
) -> Arc<dyn IdentityResolution> {
    Arc::new(IdentityResolver::new(
        verifier_chain(&config.auth),
        Arc::new(InMemoryRevocationStore::new()),
        Duration::from_secs(config.auth.revocation_ttl_secs),
        Arc::new(UserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(NotificationOutboxPostgres::new(Arc::clone(&db_pool))),
    ))
}

pub fn app(config: &DotEnvyConfig, db_pool: Arc<PgPoolSquad>) -> Result<Router> {
    let resolver = identity_resolver(config, Arc::clone(&db_pool));

    let api = Router::new()
        .nest(
            "/auth",
            routers::auth::routes(Arc::clone(&db_pool), Arc::clone(&resolver)),
        )
        .nest(
            "/businesses",
            listings::routes::<Businesses>(Arc::new(BusinessPostgres::new(Arc::clone(&db_pool)))),
        )
        .nest(
            "/professionals",
            listings::routes::<Professionals>(Arc::new(ProfessionalPostgres::new(Arc::clone(&db_pool)))),
        )
        .nest(
            "/jobs",
            listings::routes::<Jobs>(Arc::new(JobPostgres::new(Arc::clone(&db_pool)))),
        )
        .nest(
            "/applications",
            listings::routes::<JobApplications>(Arc::new(JobApplicationPostgres::new(Arc::clone(&db_pool)))),
        )
        .nest(
            "/blog/posts",
            listings::routes::<BlogPosts>(Arc::new(BlogPostPostgres::new(Arc::clone(&db_pool)))),
        )
        .nest(
            "/reviews",
            listings::routes::<Reviews>(Arc::new(ReviewPostgres::new(Arc::clone(&db_pool)))),
        )
        .nest(
            "/payments",
            routers::payments::routes(
                Arc::clone(&db_pool),
                &config.mercado_pago,
                &config.subscription,
            ),
        )
        .nest(
            "/admin",
            routers::admin::routes(Arc::clone(&db_pool), config.mercado_pago.currency.clone()),
        )
        .nest(
            "/webhooks/identity",
            routers::identity_webhooks::routes(
                Arc::clone(&db_pool),
                config.auth.webhook_secret.as_deref(),
            ),
        )
        .route("/health-check", get(default_routers::health_check));

    let app = Router::new()
        .nest("/api/v1", api)
        .fallback(default_routers::not_found)
        .layer(from_fn(audit::audit_mutations))
        .layer(from_fn_with_state(resolver, auth::authenticate))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let app = app(&config, db_pool)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(stage = %config.stage, "Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
