use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::job_applications::{
        InsertJobApplicationEntity, JobApplicationFilter, UpdateJobApplicationEntity,
    },
    value_objects::{pagination::PageRequest, validation::not_blank},
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJobApplicationModel {
    pub job_id: Uuid,
    #[validate(custom(function = "not_blank"), length(max = 5000))]
    pub cover_letter: Option<String>,
    #[validate(url, length(max = 500))]
    pub resume_url: Option<String>,
}

impl CreateJobApplicationModel {
    pub fn to_entity(&self, applicant_id: Uuid) -> InsertJobApplicationEntity {
        InsertJobApplicationEntity {
            job_id: self.job_id,
            applicant_id,
            cover_letter: self.cover_letter.as_deref().map(|s| s.trim().to_string()),
            resume_url: self.resume_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateJobApplicationModel {
    #[validate(custom(function = "not_blank"), length(max = 5000))]
    pub cover_letter: Option<String>,
    #[validate(url, length(max = 500))]
    pub resume_url: Option<String>,
}

impl UpdateJobApplicationModel {
    pub fn to_entity(&self) -> UpdateJobApplicationEntity {
        UpdateJobApplicationEntity {
            cover_letter: self
                .cover_letter
                .as_deref()
                .map(|s| Some(s.trim().to_string())),
            resume_url: self.resume_url.clone().map(Some),
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobApplicationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub job_id: Option<Uuid>,
}

impl JobApplicationQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn filter(&self) -> JobApplicationFilter {
        JobApplicationFilter {
            job_id: self.job_id,
            visible_to: None,
        }
    }
}
