use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, pg::Pg, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use super::{contains_pattern, write_error};
use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::jobs},
};
use domain::{
    entities::jobs::{InsertJobEntity, JobEntity, JobFilter, UpdateJobEntity},
    repositories::owned_resources::OwnedResourceRepository,
    value_objects::pagination::{Page, PageRequest},
};

pub struct JobPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl JobPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn filtered(filter: &JobFilter) -> jobs::BoxedQuery<'static, Pg> {
        let mut query = jobs::table.into_boxed();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(search);
            query = query.filter(
                jobs::title
                    .ilike(pattern.clone())
                    .or(jobs::description.ilike(pattern)),
            );
        }
        if let Some(category) = &filter.category {
            query = query.filter(jobs::category.eq(category.clone()));
        }
        if let Some(location) = &filter.location {
            query = query.filter(jobs::location.ilike(contains_pattern(location)));
        }
        if let Some(job_type) = &filter.job_type {
            query = query.filter(jobs::job_type.eq(job_type.clone()));
        }
        if let Some(business_id) = filter.business_id {
            query = query.filter(jobs::business_id.eq(business_id));
        }
        if let Some(status) = &filter.status {
            query = query.filter(jobs::status.eq(status.clone()));
        }

        query
    }
}

#[async_trait]
impl OwnedResourceRepository for JobPostgres {
    type Entity = JobEntity;
    type Insert = InsertJobEntity;
    type Changes = UpdateJobEntity;
    type Filter = JobFilter;

    async fn list(&self, filter: JobFilter, page: PageRequest) -> Result<Page<JobEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = Self::filtered(&filter)
            .count()
            .get_result::<i64>(&mut conn)?;

        let items = Self::filtered(&filter)
            .order(jobs::created_at.desc())
            .limit(page.per_page)
            .offset(page.offset())
            .select(JobEntity::as_select())
            .load::<JobEntity>(&mut conn)?;

        Ok(Page::new(items, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let job = jobs::table
            .filter(jobs::id.eq(id))
            .select(JobEntity::as_select())
            .first::<JobEntity>(&mut conn)
            .optional()?;

        Ok(job)
    }

    async fn create(&self, insert: InsertJobEntity) -> Result<JobEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let job = insert_into(jobs::table)
            .values(&insert)
            .returning(JobEntity::as_returning())
            .get_result::<JobEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(job)
    }

    async fn update(&self, id: Uuid, changes: UpdateJobEntity) -> Result<JobEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let job = update(jobs::table)
            .filter(jobs::id.eq(id))
            .set(&changes)
            .returning(JobEntity::as_returning())
            .get_result::<JobEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(job)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(jobs::table.filter(jobs::id.eq(id))).execute(&mut conn)?;

        if deleted == 0 {
            return Err(anyhow!("job {id} not found"));
        }

        Ok(())
    }
}
