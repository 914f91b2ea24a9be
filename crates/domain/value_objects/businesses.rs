use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::businesses::{BusinessFilter, InsertBusinessEntity, UpdateBusinessEntity},
    value_objects::{
        enums::listing_statuses::ListingStatus,
        pagination::PageRequest,
        validation::not_blank,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBusinessModel {
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub name: String,
    #[validate(custom(function = "not_blank"), length(max = 5000))]
    pub description: String,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: String,
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub location: String,
    #[validate(custom(function = "not_blank"), length(max = 30))]
    pub phone: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
}

impl CreateBusinessModel {
    pub fn to_entity(&self, owner_id: Uuid) -> InsertBusinessEntity {
        InsertBusinessEntity {
            owner_id,
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            location: self.location.trim().to_string(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            status: ListingStatus::Pending.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBusinessModel {
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub name: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 150))]
    pub location: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 30))]
    pub phone: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
}

impl UpdateBusinessModel {
    pub fn to_entity(&self) -> UpdateBusinessEntity {
        UpdateBusinessEntity {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            phone: self.phone.clone().map(Some),
            website: self.website.clone().map(Some),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

impl BusinessQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn filter(&self) -> BusinessFilter {
        BusinessFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            status: self.status.clone(),
        }
    }
}
