use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, pg::Pg, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use super::{contains_pattern, write_error};
use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::professionals},
};
use domain::{
    entities::professionals::{
        InsertProfessionalEntity, ProfessionalEntity, ProfessionalFilter,
        UpdateProfessionalEntity,
    },
    repositories::owned_resources::OwnedResourceRepository,
    value_objects::pagination::{Page, PageRequest},
};

pub struct ProfessionalPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProfessionalPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn filtered(filter: &ProfessionalFilter) -> professionals::BoxedQuery<'static, Pg> {
        let mut query = professionals::table.into_boxed();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(search);
            query = query.filter(
                professionals::name
                    .ilike(pattern.clone())
                    .or(professionals::profession.ilike(pattern.clone()))
                    .or(professionals::bio.ilike(pattern)),
            );
        }
        if let Some(category) = &filter.category {
            query = query.filter(professionals::category.eq(category.clone()));
        }
        if let Some(location) = &filter.location {
            query = query.filter(professionals::location.ilike(contains_pattern(location)));
        }
        if let Some(status) = &filter.status {
            query = query.filter(professionals::status.eq(status.clone()));
        }

        query
    }
}

#[async_trait]
impl OwnedResourceRepository for ProfessionalPostgres {
    type Entity = ProfessionalEntity;
    type Insert = InsertProfessionalEntity;
    type Changes = UpdateProfessionalEntity;
    type Filter = ProfessionalFilter;

    async fn list(
        &self,
        filter: ProfessionalFilter,
        page: PageRequest,
    ) -> Result<Page<ProfessionalEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = Self::filtered(&filter)
            .count()
            .get_result::<i64>(&mut conn)?;

        let items = Self::filtered(&filter)
            .order((professionals::featured.desc(), professionals::created_at.desc()))
            .limit(page.per_page)
            .offset(page.offset())
            .select(ProfessionalEntity::as_select())
            .load::<ProfessionalEntity>(&mut conn)?;

        Ok(Page::new(items, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProfessionalEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let professional = professionals::table
            .filter(professionals::id.eq(id))
            .select(ProfessionalEntity::as_select())
            .first::<ProfessionalEntity>(&mut conn)
            .optional()?;

        Ok(professional)
    }

    async fn create(&self, insert: InsertProfessionalEntity) -> Result<ProfessionalEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let professional = insert_into(professionals::table)
            .values(&insert)
            .returning(ProfessionalEntity::as_returning())
            .get_result::<ProfessionalEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(professional)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateProfessionalEntity,
    ) -> Result<ProfessionalEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let professional = update(professionals::table)
            .filter(professionals::id.eq(id))
            .set(&changes)
            .returning(ProfessionalEntity::as_returning())
            .get_result::<ProfessionalEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(professional)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = delete(professionals::table.filter(professionals::id.eq(id)))
            .execute(&mut conn)
            .map_err(write_error)?;

        if deleted == 0 {
            return Err(anyhow!("professional {id} not found"));
        }

        Ok(())
    }
}
