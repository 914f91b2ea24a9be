use std::sync::Arc;

use crates::{
    domain::repositories::admin_stats::{AdminStatsRepository, DashboardStats},
    retry::{RetryOptions, with_retry},
};
use tracing::{error, info};

use crate::usecases::errors::{UseCaseError, UseCaseResult};

pub struct AdminDashboardUseCase<A>
where
    A: AdminStatsRepository + Send + Sync + 'static,
{
    stats_repo: Arc<A>,
    read_retry: RetryOptions,
}

impl<A> AdminDashboardUseCase<A>
where
    A: AdminStatsRepository + Send + Sync + 'static,
{
    pub fn new(stats_repo: Arc<A>) -> Self {
        Self {
            stats_repo,
            read_retry: RetryOptions::default(),
        }
    }

    pub async fn stats(&self) -> UseCaseResult<DashboardStats> {
        let stats = with_retry(&self.read_retry, || self.stats_repo.dashboard_stats())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "admin: failed to load dashboard stats");
                UseCaseError::Internal(err)
            })?;

        info!(
            users = stats.users,
            active_subscriptions = stats.active_subscriptions,
            "admin: dashboard stats loaded"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::admin_stats::{MockAdminStatsRepository, StatusCounts};

    #[tokio::test]
    async fn returns_repository_figures() {
        let mut repo = MockAdminStatsRepository::new();
        repo.expect_dashboard_stats().times(1).returning(|| {
            Ok(DashboardStats {
                users: 12,
                businesses: StatusCounts {
                    pending: 2,
                    approved: 5,
                    rejected: 1,
                },
                active_subscriptions: 4,
                paid_revenue_minor: 19_960,
                ..Default::default()
            })
        });

        let stats = AdminDashboardUseCase::new(Arc::new(repo)).stats().await.unwrap();

        assert_eq!(stats.users, 12);
        assert_eq!(stats.businesses.approved, 5);
        assert_eq!(stats.paid_revenue_minor, 19_960);
    }
}
