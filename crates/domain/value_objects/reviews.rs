use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::{
    entities::reviews::{InsertReviewEntity, ReviewFilter, UpdateReviewEntity},
    value_objects::{
        enums::listing_statuses::ReviewStatus,
        pagination::PageRequest,
        validation::{invalid, not_blank},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "one_review_target", skip_on_field_errors = false))]
pub struct CreateReviewModel {
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub comment: Option<String>,
}

fn one_review_target(model: &CreateReviewModel) -> Result<(), ValidationError> {
    if model.business_id.is_some() == model.professional_id.is_some() {
        return Err(invalid(
            "business_id",
            "exactly one of business_id or professional_id is required",
        ));
    }
    Ok(())
}

impl CreateReviewModel {
    pub fn to_entity(&self, author_id: Uuid) -> InsertReviewEntity {
        InsertReviewEntity {
            author_id,
            business_id: self.business_id,
            professional_id: self.professional_id,
            rating: self.rating,
            comment: self.comment.clone(),
            status: ReviewStatus::Published.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReviewModel {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub comment: Option<String>,
}

impl UpdateReviewModel {
    pub fn to_entity(&self) -> UpdateReviewEntity {
        UpdateReviewEntity {
            rating: self.rating,
            comment: self.comment.clone().map(Some),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub status: Option<String>,
}

impl ReviewQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn filter(&self) -> ReviewFilter {
        ReviewFilter {
            business_id: self.business_id,
            professional_id: self.professional_id,
            author_id: self.author_id,
            status: self.status.clone(),
        }
    }
}
