use anyhow::{Result, anyhow};
use async_trait::async_trait;
use diesel::{RunQueryDsl, delete, insert_into, pg::Pg, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use super::{contains_pattern, write_error};
use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{businesses, jobs},
    },
};
use domain::{
    entities::businesses::{
        BusinessEntity, BusinessFilter, InsertBusinessEntity, UpdateBusinessEntity,
    },
    repositories::owned_resources::OwnedResourceRepository,
    value_objects::pagination::{Page, PageRequest},
};

pub struct BusinessPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BusinessPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn filtered(filter: &BusinessFilter) -> businesses::BoxedQuery<'static, Pg> {
        let mut query = businesses::table.into_boxed();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(search);
            query = query.filter(
                businesses::name
                    .ilike(pattern.clone())
                    .or(businesses::description.ilike(pattern)),
            );
        }
        if let Some(category) = &filter.category {
            query = query.filter(businesses::category.eq(category.clone()));
        }
        if let Some(location) = &filter.location {
            query = query.filter(businesses::location.ilike(contains_pattern(location)));
        }
        if let Some(status) = &filter.status {
            query = query.filter(businesses::status.eq(status.clone()));
        }

        query
    }
}

#[async_trait]
impl OwnedResourceRepository for BusinessPostgres {
    type Entity = BusinessEntity;
    type Insert = InsertBusinessEntity;
    type Changes = UpdateBusinessEntity;
    type Filter = BusinessFilter;

    async fn list(&self, filter: BusinessFilter, page: PageRequest) -> Result<Page<BusinessEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = Self::filtered(&filter)
            .count()
            .get_result::<i64>(&mut conn)?;

        let items = Self::filtered(&filter)
            .order((businesses::featured.desc(), businesses::created_at.desc()))
            .limit(page.per_page)
            .offset(page.offset())
            .select(BusinessEntity::as_select())
            .load::<BusinessEntity>(&mut conn)?;

        Ok(Page::new(items, total, page))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BusinessEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let business = businesses::table
            .filter(businesses::id.eq(id))
            .select(BusinessEntity::as_select())
            .first::<BusinessEntity>(&mut conn)
            .optional()?;

        Ok(business)
    }

    async fn create(&self, insert: InsertBusinessEntity) -> Result<BusinessEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let business = insert_into(businesses::table)
            .values(&insert)
            .returning(BusinessEntity::as_returning())
            .get_result::<BusinessEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(business)
    }

    async fn update(&self, id: Uuid, changes: UpdateBusinessEntity) -> Result<BusinessEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let business = update(businesses::table)
            .filter(businesses::id.eq(id))
            .set(&changes)
            .returning(BusinessEntity::as_returning())
            .get_result::<BusinessEntity>(&mut conn)
            .map_err(write_error)?;

        Ok(business)
    }

    /// Jobs posted under the business go with it.
    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                delete(jobs::table.filter(jobs::business_id.eq(id))).execute(conn)?;
                delete(businesses::table.filter(businesses::id.eq(id))).execute(conn)
            })
            .map_err(write_error)?;

        if deleted == 0 {
            return Err(anyhow!("business {id} not found"));
        }

        Ok(())
    }
}
