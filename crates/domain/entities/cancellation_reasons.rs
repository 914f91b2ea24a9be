use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::cancellation_reasons;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = cancellation_reasons)]
pub struct CancellationReasonEntity {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = cancellation_reasons)]
pub struct InsertCancellationReasonEntity {
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub feedback: Option<String>,
}
