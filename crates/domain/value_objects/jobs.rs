use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::jobs::{InsertJobEntity, JobFilter, UpdateJobEntity},
    value_objects::{
        enums::listing_statuses::JobStatus,
        pagination::PageRequest,
        validation::{known_job_status, known_job_type, not_blank},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJobModel {
    pub business_id: Option<Uuid>,
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub title: String,
    #[validate(custom(function = "not_blank"), length(max = 10000))]
    pub description: String,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: String,
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub location: String,
    #[validate(custom(function = "known_job_type"))]
    pub job_type: String,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub salary_range: Option<String>,
}

impl CreateJobModel {
    pub fn to_entity(&self, owner_id: Uuid) -> InsertJobEntity {
        InsertJobEntity {
            owner_id,
            business_id: self.business_id,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            location: self.location.trim().to_string(),
            job_type: self.job_type.clone(),
            salary_range: self.salary_range.clone(),
            status: JobStatus::Open.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateJobModel {
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 10000))]
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub location: Option<String>,
    #[validate(custom(function = "known_job_type"))]
    pub job_type: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub salary_range: Option<String>,
    #[validate(custom(function = "known_job_status"))]
    pub status: Option<String>,
}

impl UpdateJobModel {
    /// Owners open and close their own postings, so status is editable here.
    pub fn to_entity(&self) -> UpdateJobEntity {
        UpdateJobEntity {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            job_type: self.job_type.clone(),
            salary_range: self.salary_range.clone().map(Some),
            status: self.status.clone(),
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub business_id: Option<Uuid>,
    pub status: Option<String>,
}

impl JobQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn filter(&self) -> JobFilter {
        JobFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            job_type: self.job_type.clone(),
            business_id: self.business_id,
            status: self.status.clone(),
        }
    }
}
