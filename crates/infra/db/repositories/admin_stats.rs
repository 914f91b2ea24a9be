use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, dsl::sum, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{blog_posts, businesses, jobs, payments, professionals, reviews, subscriptions, users},
    },
};
use domain::{
    repositories::admin_stats::{AdminStatsRepository, DashboardStats, StatusCounts},
    value_objects::enums::{
        listing_statuses::{JobStatus, ListingStatus, PostStatus},
        payment_statuses::PaymentStatus,
        subscription_statuses::SubscriptionStatus,
    },
};

pub struct AdminStatsPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AdminStatsPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn status_counts(rows: Vec<(String, i64)>) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for (status, total) in rows {
        match ListingStatus::from_str(&status) {
            Some(ListingStatus::Pending) => counts.pending += total,
            Some(ListingStatus::Approved) => counts.approved += total,
            Some(ListingStatus::Rejected) => counts.rejected += total,
            None => {}
        }
    }
    counts
}

#[async_trait]
impl AdminStatsRepository for AdminStatsPostgres {
    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let users = users::table.count().get_result::<i64>(&mut conn)?;

        let business_rows = businesses::table
            .group_by(businesses::status)
            .select((businesses::status, diesel::dsl::count_star()))
            .load::<(String, i64)>(&mut conn)?;

        let professional_rows = professionals::table
            .group_by(professionals::status)
            .select((professionals::status, diesel::dsl::count_star()))
            .load::<(String, i64)>(&mut conn)?;

        let open_jobs = jobs::table
            .filter(jobs::status.eq(JobStatus::Open.as_str()))
            .count()
            .get_result::<i64>(&mut conn)?;

        let published_posts = blog_posts::table
            .filter(blog_posts::status.eq(PostStatus::Published.as_str()))
            .count()
            .get_result::<i64>(&mut conn)?;

        let reviews = reviews::table.count().get_result::<i64>(&mut conn)?;

        let active_subscriptions = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.as_str()))
            .count()
            .get_result::<i64>(&mut conn)?;

        let paid_revenue_minor = payments::table
            .filter(payments::status.eq(PaymentStatus::Paid.as_str()))
            .select(sum(payments::amount_minor))
            .first::<Option<i64>>(&mut conn)?
            .unwrap_or(0);

        Ok(DashboardStats {
            users,
            businesses: status_counts(business_rows),
            professionals: status_counts(professional_rows),
            open_jobs,
            published_posts,
            reviews,
            active_subscriptions,
            paid_revenue_minor,
        })
    }
}
