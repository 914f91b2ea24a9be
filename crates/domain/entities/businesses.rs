use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{
        repositories::owned_resources::{ListingFilter, OwnedEntity},
        value_objects::enums::listing_statuses::ListingStatus,
    },
    infra::db::postgres::schema::businesses,
};

#[derive(Debug, Clone, PartialEq, Serialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = businesses)]
pub struct BusinessEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub status: String,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedEntity for BusinessEntity {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn is_public(&self) -> bool {
        self.status == ListingStatus::Approved.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = businesses)]
pub struct InsertBusinessEntity {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = businesses)]
pub struct UpdateBusinessEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub phone: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateBusinessEntity {
    pub fn moderation(status: ListingStatus) -> Self {
        Self {
            status: Some(status.to_string()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

impl ListingFilter for BusinessFilter {
    fn restrict_to_public(&mut self) {
        self.status = Some(ListingStatus::Approved.to_string());
    }
}
