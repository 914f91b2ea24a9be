use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::blog_posts::{BlogPostFilter, InsertBlogPostEntity, UpdateBlogPostEntity},
    value_objects::{
        enums::listing_statuses::PostStatus,
        pagination::PageRequest,
        validation::{known_post_status, not_blank, valid_slug},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBlogPostModel {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    #[validate(custom(function = "valid_slug"))]
    pub slug: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 100000))]
    pub content: String,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: String,
    #[serde(default)]
    pub publish: bool,
}

impl CreateBlogPostModel {
    pub fn to_entity(&self, author_id: Uuid) -> InsertBlogPostEntity {
        let status = if self.publish {
            PostStatus::Published
        } else {
            PostStatus::Draft
        };

        InsertBlogPostEntity {
            author_id,
            title: self.title.trim().to_string(),
            slug: self
                .slug
                .clone()
                .unwrap_or_else(|| slugify(&self.title)),
            excerpt: self.excerpt.clone(),
            content: self.content.clone(),
            category: self.category.trim().to_string(),
            status: status.to_string(),
            published_at: self.publish.then(Utc::now),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBlogPostModel {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: Option<String>,
    #[validate(custom(function = "valid_slug"))]
    pub slug: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 100000))]
    pub content: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 80))]
    pub category: Option<String>,
    #[validate(custom(function = "known_post_status"))]
    pub status: Option<String>,
}

impl UpdateBlogPostModel {
    pub fn to_entity(&self) -> UpdateBlogPostEntity {
        let now = Utc::now();
        let status = self.status.as_deref().and_then(PostStatus::from_str);

        UpdateBlogPostEntity {
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone().map(Some),
            content: self.content.clone(),
            category: self.category.clone(),
            status: status.map(|status| status.to_string()),
            published_at: match status {
                Some(PostStatus::Published) => Some(Some(now)),
                _ => None,
            },
            updated_at: Some(now),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogPostQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl BlogPostQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    pub fn filter(&self) -> BlogPostFilter {
        BlogPostFilter {
            search: self.search.clone(),
            category: self.category.clone(),
            status: self.status.clone(),
        }
    }
}

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation_and_spaces() {
        assert_eq!(slugify("  Hello, World! 2026 "), "hello-world-2026");
        assert_eq!(slugify("Dicas --- para negócios"), "dicas-para-neg-cios");
    }

    #[test]
    fn draft_posts_have_no_publication_date() {
        let model = CreateBlogPostModel {
            title: "Launch notes".to_string(),
            slug: None,
            excerpt: None,
            content: "body".to_string(),
            category: "news".to_string(),
            publish: false,
        };

        let entity = model.to_entity(Uuid::new_v4());
        assert_eq!(entity.slug, "launch-notes");
        assert_eq!(entity.status, "draft");
        assert!(entity.published_at.is_none());
    }

    #[test]
    fn bad_slug_and_unknown_status_are_rejected() {
        let model = UpdateBlogPostModel {
            slug: Some("Not A Slug".to_string()),
            status: Some("hidden".to_string()),
            ..Default::default()
        };

        let errors = model.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("slug"));
        assert!(fields.contains_key("status"));
    }
}
