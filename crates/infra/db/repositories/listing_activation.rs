use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{businesses, professionals},
    },
};
use domain::{
    repositories::listing_activation::ListingActivationRepository,
    value_objects::enums::listing_statuses::ListingStatus,
};

pub struct ListingActivationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ListingActivationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ListingActivationRepository for ListingActivationPostgres {
    async fn business_owner(&self, business_id: Uuid) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let owner = businesses::table
            .filter(businesses::id.eq(business_id))
            .select(businesses::owner_id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(owner)
    }

    async fn professional_owner(&self, professional_id: Uuid) -> Result<Option<Uuid>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let owner = professionals::table
            .filter(professionals::id.eq(professional_id))
            .select(professionals::owner_id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(owner)
    }

    async fn activate_business(&self, business_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(businesses::table)
            .filter(businesses::id.eq(business_id))
            .set((
                businesses::status.eq(ListingStatus::Approved.as_str()),
                businesses::featured.eq(true),
                businesses::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn activate_professional(&self, professional_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(professionals::table)
            .filter(professionals::id.eq(professional_id))
            .set((
                professionals::status.eq(ListingStatus::Approved.as_str()),
                professionals::featured.eq(true),
                professionals::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
