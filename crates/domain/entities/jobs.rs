use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{
        repositories::owned_resources::{ListingFilter, OwnedEntity},
        value_objects::enums::listing_statuses::JobStatus,
    },
    infra::db::postgres::schema::jobs,
};

#[derive(Debug, Clone, PartialEq, Serialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = jobs)]
pub struct JobEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub business_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub job_type: String,
    pub salary_range: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedEntity for JobEntity {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn is_public(&self) -> bool {
        self.status == JobStatus::Open.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = jobs)]
pub struct InsertJobEntity {
    pub owner_id: Uuid,
    pub business_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub job_type: String,
    pub salary_range: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = jobs)]
pub struct UpdateJobEntity {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary_range: Option<Option<String>>,
    pub status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub business_id: Option<Uuid>,
    pub status: Option<String>,
}

impl ListingFilter for JobFilter {
    fn restrict_to_public(&mut self) {
        self.status = Some(JobStatus::Open.to_string());
    }
}
