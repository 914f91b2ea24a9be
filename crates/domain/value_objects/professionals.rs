use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::professionals::{
        InsertProfessionalEntity, ProfessionalFilter, UpdateProfessionalEntity,
    },
    value_objects::{
        enums::listing_statuses::ListingStatus,
        pagination::PageRequest,
        validation::not_blank,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProfessionalModel {
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub name: String,
    #[validate(custom(function = "not_blank"), length(max = 120))]
    pub profession: String,
    #[validate(custom(function = "not_blank"), length(max = 5000))]
    pub bio: String,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: String,
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub location: String,
    #[validate(custom(function = "not_blank"), length(max = 30))]
    pub phone: Option<String>,
}

impl CreateProfessionalModel {
    pub fn to_entity(&self, owner_id: Uuid) -> InsertProfessionalEntity {
        InsertProfessionalEntity {
            owner_id,
            name: self.name.trim().to_string(),
            profession: self.profession.trim().to_string(),
            bio: self.bio.trim().to_string(),
            category: self.category.trim().to_string(),
            location: self.location.trim().to_string(),
            phone: self.phone.clone(),
            status: ListingStatus::Pending.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfessionalModel {
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub name: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 120))]
    pub profession: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 5000))]
    pub bio: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub location: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 30))]
    pub phone: Option<String>,
}

impl UpdateProfessionalModel {
    pub fn to_entity(&self) -> UpdateProfessionalEntity {
        UpdateProfessionalEntity {
            name: self.name.clone(),
            profession: self.profession.clone(),
            bio: self.bio.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            phone: self.phone.clone().map(Some),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfessionalQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

impl ProfessionalQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn filter(&self) -> ProfessionalFilter {
        ProfessionalFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            status: self.status.clone(),
        }
    }
}
