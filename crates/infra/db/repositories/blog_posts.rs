use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, pg::Pg, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use super::{contains_pattern, write_error};
use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::blog_posts},
};
use domain::{
    entities::blog_posts::{
        BlogPostEntity, BlogPostFilter, InsertBlogPostEntity, UpdateBlogPostEntity,
    },
    repositories::owned_resources::OwnedResourceRepository,
    value_objects::pagination::{Page, PageRequest},
};

pub struct BlogPostPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BlogPostPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn filtered(filter: &BlogPostFilter) -> blog_posts::BoxedQuery<'static, Pg> {
        let mut query = blog_posts::table.into_boxed();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(search);
            query = query.filter(
                blog_posts::title
                    .ilike(pattern.clone())
                    .or(blog_posts::excerpt.ilike(pattern.clone()))
                    .or(blog_posts::content.ilike(pattern)),
            );
        }
        if let Some(category) = &filter.category {
            query = query.filter(blog_posts::category.eq(category.clone()));
        }
        if let Some(status) = &filter.status {
            query = query.filter(blog_posts::status.eq(status.clone()));
        }

        query
    }
}

#[async_trait]
impl OwnedResourceRepository for BlogPostPostgres {
    type Entity = BlogPostEntity;
    type Insert = InsertBlogPostEntity;
    type Changes = UpdateBlogPostEntity;
    type Filter = BlogPostFilter;

    async fn list(&self, filter: BlogPostFilter, page: PageRequest) -> Result<Page<BlogPostEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = Self::filtered(&filter)
            .count()
            .get_result::<i64>(&mut conn)?;

        let items = Self::filtered(&filter)
            .order(blog_posts::created_at.desc())
            .limit(page.per_page)
            .offset(page.offset())
            .select(BlogPostEntity::as_select())
            .load::<BlogPostEntity>(&mut conn)?;

        Ok(Page::new(items, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BlogPostEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let post = blog_posts::table
            .filter(blog_posts::id.eq(id))
            .select(BlogPostEntity::as_select())
            .first::<BlogPostEntity>(&mut conn)
            .optional()?;

        Ok(post)
    }

    async fn create(&self, insert: InsertBlogPostEntity) -> Result<BlogPostEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let post = insert_into(blog_posts::table)
            .values(&insert)
            .returning(BlogPostEntity::as_returning())
            .get_result::<BlogPostEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(post)
    }

    async fn update(&self, id: Uuid, changes: UpdateBlogPostEntity) -> Result<BlogPostEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let post = update(blog_posts::table)
            .filter(blog_posts::id.eq(id))
            .set(&changes)
            .returning(BlogPostEntity::as_returning())
            .get_result::<BlogPostEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(blog_posts::table.filter(blog_posts::id.eq(id))).execute(&mut conn)?;

        if deleted == 0 {
            return Err(anyhow!("blog post {id} not found"));
        }

        Ok(())
    }
}
