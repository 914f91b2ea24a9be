use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{
        repositories::owned_resources::{ListingFilter, OwnedEntity},
        value_objects::enums::listing_statuses::ReviewStatus,
    },
    infra::db::postgres::schema::reviews,
};

#[derive(Debug, Clone, PartialEq, Serialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = reviews)]
pub struct ReviewEntity {
    pub id: Uuid,
    pub author_id: Uuid,
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedEntity for ReviewEntity {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.author_id
    }

    fn is_public(&self) -> bool {
        self.status == ReviewStatus::Published.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = reviews)]
pub struct InsertReviewEntity {
    pub author_id: Uuid,
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = reviews)]
pub struct UpdateReviewEntity {
    pub rating: Option<i32>,
    pub comment: Option<Option<String>>,
    pub status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateReviewEntity {
    pub fn moderation(status: ReviewStatus) -> Self {
        Self {
            status: Some(status.to_string()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewFilter {
    pub business_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub status: Option<String>,
}

impl ListingFilter for ReviewFilter {
    fn restrict_to_public(&mut self) {
        self.status = Some(ReviewStatus::Published.to_string());
    }
}
