use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, pg::Pg, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use super::write_error;
use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{job_applications, jobs},
    },
};
use domain::{
    entities::job_applications::{
        InsertJobApplicationEntity, JobApplicationEntity, JobApplicationFilter,
        UpdateJobApplicationEntity,
    },
    repositories::owned_resources::OwnedResourceRepository,
    value_objects::pagination::{Page, PageRequest},
};

pub struct JobApplicationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl JobApplicationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn filtered(filter: &JobApplicationFilter) -> job_applications::BoxedQuery<'static, Pg> {
        let mut query = job_applications::table.into_boxed();

        if let Some(job_id) = filter.job_id {
            query = query.filter(job_applications::job_id.eq(job_id));
        }
        match filter.visible_to {
            Some(Some(viewer)) => {
                let own_jobs = jobs::table
                    .filter(jobs::owner_id.eq(viewer))
                    .select(jobs::id);
                query = query.filter(
                    job_applications::applicant_id
                        .eq(viewer)
                        .or(job_applications::job_id.eq_any(own_jobs)),
                );
            }
            Some(None) => query = query.filter(job_applications::id.is_null()),
            None => {}
        }

        query
    }
}

#[async_trait]
impl OwnedResourceRepository for JobApplicationPostgres {
    type Entity = JobApplicationEntity;
    type Insert = InsertJobApplicationEntity;
    type Changes = UpdateJobApplicationEntity;
    type Filter = JobApplicationFilter;

    async fn list(
        &self,
        filter: JobApplicationFilter,
        page: PageRequest,
    ) -> Result<Page<JobApplicationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = Self::filtered(&filter)
            .count()
            .get_result::<i64>(&mut conn)?;

        let items = Self::filtered(&filter)
            .order(job_applications::created_at.desc())
            .limit(page.per_page)
            .offset(page.offset())
            .select(JobApplicationEntity::as_select())
            .load::<JobApplicationEntity>(&mut conn)?;

        Ok(Page::new(items, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobApplicationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let application = job_applications::table
            .filter(job_applications::id.eq(id))
            .select(JobApplicationEntity::as_select())
            .first::<JobApplicationEntity>(&mut conn)
            .optional()?;

        Ok(application)
    }

    async fn create(&self, insert: InsertJobApplicationEntity) -> Result<JobApplicationEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let application = insert_into(job_applications::table)
            .values(&insert)
            .returning(JobApplicationEntity::as_returning())
            .get_result::<JobApplicationEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(application)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateJobApplicationEntity,
    ) -> Result<JobApplicationEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let application = update(job_applications::table)
            .filter(job_applications::id.eq(id))
            .set(&changes)
            .returning(JobApplicationEntity::as_returning())
            .get_result::<JobApplicationEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(application)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(job_applications::table.filter(job_applications::id.eq(id)))
            .execute(&mut conn)?;

        if deleted == 0 {
            return Err(anyhow!("job application {id} not found"));
        }

        Ok(())
    }
}
