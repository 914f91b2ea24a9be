use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, pg::Pg, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use super::write_error;
use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::reviews},
};
use domain::{
    entities::reviews::{InsertReviewEntity, ReviewEntity, ReviewFilter, UpdateReviewEntity},
    repositories::owned_resources::OwnedResourceRepository,
    value_objects::pagination::{Page, PageRequest},
};

pub struct ReviewPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ReviewPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn filtered(filter: &ReviewFilter) -> reviews::BoxedQuery<'static, Pg> {
        let mut query = reviews::table.into_boxed();

        if let Some(business_id) = filter.business_id {
            query = query.filter(reviews::business_id.eq(business_id));
        }
        if let Some(professional_id) = filter.professional_id {
            query = query.filter(reviews::professional_id.eq(professional_id));
        }
        if let Some(author_id) = filter.author_id {
            query = query.filter(reviews::author_id.eq(author_id));
        }
        if let Some(status) = &filter.status {
            query = query.filter(reviews::status.eq(status.clone()));
        }

        query
    }
}

#[async_trait]
impl OwnedResourceRepository for ReviewPostgres {
    type Entity = ReviewEntity;
    type Insert = InsertReviewEntity;
    type Changes = UpdateReviewEntity;
    type Filter = ReviewFilter;

    async fn list(&self, filter: ReviewFilter, page: PageRequest) -> Result<Page<ReviewEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = Self::filtered(&filter)
            .count()
            .get_result::<i64>(&mut conn)?;

        let items = Self::filtered(&filter)
            .order(reviews::created_at.desc())
            .limit(page.per_page)
            .offset(page.offset())
            .select(ReviewEntity::as_select())
            .load::<ReviewEntity>(&mut conn)?;

        Ok(Page::new(items, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ReviewEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let review = reviews::table
            .filter(reviews::id.eq(id))
            .select(ReviewEntity::as_select())
            .first::<ReviewEntity>(&mut conn)
            .optional()?;

        Ok(review)
    }

    /// One review per author and target; a second one fails as a unique violation.
    async fn create(&self, insert: InsertReviewEntity) -> Result<ReviewEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let review = insert_into(reviews::table)
            .values(&insert)
            .returning(ReviewEntity::as_returning())
            .get_result::<ReviewEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(review)
    }

    async fn update(&self, id: Uuid, changes: UpdateReviewEntity) -> Result<ReviewEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let review = update(reviews::table)
            .filter(reviews::id.eq(id))
            .set(&changes)
            .returning(ReviewEntity::as_returning())
            .get_result::<ReviewEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(reviews::table.filter(reviews::id.eq(id))).execute(&mut conn)?;

        if deleted == 0 {
            return Err(anyhow!("review {id} not found"));
        }

        Ok(())
    }
}
