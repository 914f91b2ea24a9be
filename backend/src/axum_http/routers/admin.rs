use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, patch},
};
use crates::{
    domain::{
        repositories::{
            admin_stats::AdminStatsRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::{
            plans::{CreatePlanModel, UpdatePlanModel},
            users::UpdateUserAccessModel,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            admin_stats::AdminStatsPostgres, blog_posts::BlogPostPostgres,
            businesses::BusinessPostgres, plans::PlanPostgres,
            professionals::ProfessionalPostgres, reviews::ReviewPostgres,
            subscriptions::SubscriptionPostgres, users::UserPostgres,
        },
    },
};
use tracing::info;
use uuid::Uuid;

use super::listings::{self, BlogPosts, Businesses, Professionals, Reviews};
use crate::{
    auth::{ADMIN_ONLY, AuthUser, require_roles},
    axum_http::{error_responses::AppError, validated_json::ValidatedJson},
    usecases::{admin_dashboard::AdminDashboardUseCase, plans::PlanUseCase, users::UserUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, default_currency: String) -> Router {
    let plan_usecase = PlanUseCase::new(
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
        default_currency,
    );
    let dashboard_usecase =
        AdminDashboardUseCase::new(Arc::new(AdminStatsPostgres::new(Arc::clone(&db_pool))));
    let user_usecase = UserUseCase::new(Arc::new(UserPostgres::new(Arc::clone(&db_pool))));

    let plans = Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/:id", patch(update_plan).delete(delete_plan))
        .with_state(Arc::new(plan_usecase));
    let stats = Router::new()
        .route("/stats", get(dashboard_stats))
        .with_state(Arc::new(dashboard_usecase));
    let users = Router::new()
        .route("/users/:id", patch(update_user_access))
        .with_state(Arc::new(user_usecase));

    Router::new()
        .merge(plans)
        .merge(stats)
        .merge(users)
        .nest(
            "/businesses",
            listings::moderation_routes::<Businesses>(Arc::new(BusinessPostgres::new(
                Arc::clone(&db_pool),
            ))),
        )
        .nest(
            "/professionals",
            listings::moderation_routes::<Professionals>(Arc::new(ProfessionalPostgres::new(
                Arc::clone(&db_pool),
            ))),
        )
        .nest(
            "/reviews",
            listings::moderation_routes::<Reviews>(Arc::new(ReviewPostgres::new(Arc::clone(
                &db_pool,
            )))),
        )
        .nest(
            "/blog/posts",
            listings::moderation_routes::<BlogPosts>(Arc::new(BlogPostPostgres::new(
                Arc::clone(&db_pool),
            ))),
        )
        .route_layer(from_fn_with_state(ADMIN_ONLY, require_roles))
}

pub async fn list_plans<P, S>(State(usecase): State<Arc<PlanUseCase<P, S>>>) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.list_all().await {
        Ok(plans) => Json(plans).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn create_plan<P, S>(
    State(usecase): State<Arc<PlanUseCase<P, S>>>,
    ValidatedJson(model): ValidatedJson<CreatePlanModel>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.create(model).await {
        Ok(plan) => (StatusCode::CREATED, Json(plan)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update_plan<P, S>(
    State(usecase): State<Arc<PlanUseCase<P, S>>>,
    Path(plan_id): Path<Uuid>,
    ValidatedJson(model): ValidatedJson<UpdatePlanModel>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.update(plan_id, model).await {
        Ok(plan) => Json(plan).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn delete_plan<P, S>(
    State(usecase): State<Arc<PlanUseCase<P, S>>>,
    Path(plan_id): Path<Uuid>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    match usecase.delete(plan_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn dashboard_stats<A>(
    State(usecase): State<Arc<AdminDashboardUseCase<A>>>,
) -> impl IntoResponse
where
    A: AdminStatsRepository + Send + Sync + 'static,
{
    match usecase.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update_user_access<U>(
    State(usecase): State<Arc<UserUseCase<U>>>,
    AuthUser { user_id: admin_id, .. }: AuthUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(model): ValidatedJson<UpdateUserAccessModel>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
{
    info!(%admin_id, %user_id, "admin: user access update requested");
    match usecase.update_access(admin_id, user_id, model).await {
        Ok(user) => Json(user).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
