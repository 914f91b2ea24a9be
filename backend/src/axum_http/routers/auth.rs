use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use crates::{
    domain::repositories::users::UserRepository,
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
};
use tracing::info;

use crate::{
    auth::{AuthUser, IdentityResolution},
    axum_http::error_responses::AppError,
    usecases::users::UserUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>, resolver: Arc<dyn IdentityResolution>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let user_usecase = UserUseCase::new(Arc::new(user_repository));

    Router::new()
        .route("/me", get(me))
        .with_state(Arc::new(user_usecase))
        .merge(
            Router::new()
                .route("/logout", post(logout))
                .with_state(resolver),
        )
}

pub async fn me<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
{
    match usecase.me(user_id).await {
        Ok(user) => Json(user).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

/// Revokes the presented credential until it would have expired anyway.
pub async fn logout(
    State(resolver): State<Arc<dyn IdentityResolution>>,
    AuthUser { user_id, .. }: AuthUser,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> impl IntoResponse {
    resolver.revoke(bearer.token()).await;
    info!(%user_id, "auth: credential revoked on logout");
    StatusCode::NO_CONTENT.into_response()
}
