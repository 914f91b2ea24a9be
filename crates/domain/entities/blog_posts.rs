use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{
        repositories::owned_resources::{ListingFilter, OwnedEntity},
        value_objects::enums::listing_statuses::PostStatus,
    },
    infra::db::postgres::schema::blog_posts,
};

#[derive(Debug, Clone, PartialEq, Serialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = blog_posts)]
pub struct BlogPostEntity {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedEntity for BlogPostEntity {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.author_id
    }

    fn is_public(&self) -> bool {
        self.status == PostStatus::Published.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = blog_posts)]
pub struct InsertBlogPostEntity {
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = blog_posts)]
pub struct UpdateBlogPostEntity {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateBlogPostEntity {
    pub fn moderation(status: PostStatus) -> Self {
        let now = Utc::now();
        Self {
            status: Some(status.to_string()),
            published_at: match status {
                PostStatus::Published => Some(Some(now)),
                _ => None,
            },
            updated_at: Some(now),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogPostFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl ListingFilter for BlogPostFilter {
    fn restrict_to_public(&mut self) {
        self.status = Some(PostStatus::Published.to_string());
    }
}
