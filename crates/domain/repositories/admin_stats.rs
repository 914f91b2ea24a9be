use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub users: i64,
    pub businesses: StatusCounts,
    pub professionals: StatusCounts,
    pub open_jobs: i64,
    pub published_posts: i64,
    pub reviews: i64,
    pub active_subscriptions: i64,
    pub paid_revenue_minor: i64,
}

#[automock]
#[async_trait]
pub trait AdminStatsRepository {
    async fn dashboard_stats(&self) -> Result<DashboardStats>;
}
