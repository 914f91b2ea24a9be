use std::sync::Arc;

use crates::domain::{
    repositories::{plans::PlanRepository, subscriptions::SubscriptionRepository},
    value_objects::plans::{CreatePlanModel, PlanDto, UpdatePlanModel},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::errors::{UseCaseError, UseCaseResult};

pub struct PlanUseCase<P, S>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    default_currency: String,
}

impl<P, S> PlanUseCase<P, S>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(plan_repo: Arc<P>, subscription_repo: Arc<S>, default_currency: String) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            default_currency,
        }
    }

    pub async fn list_all(&self) -> UseCaseResult<Vec<PlanDto>> {
        let plans = self.plan_repo.list_all_plans().await.map_err(|err| {
            error!(db_error = ?err, "plans: failed to list plans");
            UseCaseError::Internal(err)
        })?;

        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    pub async fn create(&self, model: CreatePlanModel) -> UseCaseResult<PlanDto> {
        let mut insert = model.to_entity();
        if model.currency.is_none() {
            insert.currency = self.default_currency.clone();
        }

        let plan = self.plan_repo.create(insert).await.map_err(|err| {
            error!(db_error = ?err, "plans: failed to create plan");
            UseCaseError::from_write(err, "a plan with this name already exists")
        })?;

        info!(plan_id = %plan.id, plan_type = plan.plan_type.as_str(), "plans: created");
        Ok(PlanDto::from(plan))
    }

    pub async fn update(&self, plan_id: Uuid, model: UpdatePlanModel) -> UseCaseResult<PlanDto> {
        self.ensure_exists(plan_id).await?;

        let plan = self
            .plan_repo
            .update(plan_id, model.to_entity())
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "plans: failed to update plan");
                UseCaseError::from_write(err, "a plan with this name already exists")
            })?;

        info!(%plan_id, "plans: updated");
        Ok(PlanDto::from(plan))
    }

    /// Plans still referenced by an active subscription cannot be removed.
    pub async fn delete(&self, plan_id: Uuid) -> UseCaseResult<()> {
        self.ensure_exists(plan_id).await?;

        let active = self
            .subscription_repo
            .count_active_for_plan(plan_id)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "plans: failed to count subscriptions");
                UseCaseError::Internal(err)
            })?;
        if active > 0 {
            warn!(%plan_id, active, "plans: delete refused, plan in use");
            return Err(UseCaseError::Conflict(format!(
                "plan has {active} active subscription(s)"
            )));
        }

        self.plan_repo.delete(plan_id).await.map_err(|err| {
            error!(%plan_id, db_error = ?err, "plans: failed to delete plan");
            UseCaseError::from_write(err, "plan is still referenced")
        })?;

        info!(%plan_id, "plans: deleted");
        Ok(())
    }

    async fn ensure_exists(&self, plan_id: Uuid) -> UseCaseResult<()> {
        self.plan_repo
            .find_by_id(plan_id)
            .await
            .map_err(|err| {
                error!(%plan_id, db_error = ?err, "plans: failed to load plan");
                UseCaseError::Internal(err)
            })?
            .map(|_| ())
            .ok_or(UseCaseError::NotFound("plan"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crates::domain::{
        entities::plans::PlanEntity,
        repositories::{plans::MockPlanRepository, subscriptions::MockSubscriptionRepository},
        value_objects::{enums::plan_types::PlanType, plans::PlanFeatures},
    };
    use mockall::predicate::eq;

    fn plan(id: Uuid) -> PlanEntity {
        PlanEntity {
            id,
            name: "Profissional".to_string(),
            description: None,
            price_minor: 2_990,
            currency: "BRL".to_string(),
            duration_days: 30,
            plan_type: PlanType::Professional,
            features: PlanFeatures(vec!["highlight".to_string()]),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn plan_in_use_cannot_be_deleted() {
        let plan_id = Uuid::new_v4();
        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();

        plan_repo
            .expect_find_by_id()
            .with(eq(plan_id))
            .returning(move |id| Ok(Some(plan(id))));
        subscription_repo
            .expect_count_active_for_plan()
            .with(eq(plan_id))
            .returning(|_| Ok(3));
        plan_repo.expect_delete().times(0);

        let usecase = PlanUseCase::new(
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
            "BRL".to_string(),
        );
        let err = usecase.delete(plan_id).await.unwrap_err();

        assert!(matches!(err, UseCaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn unused_plan_is_deleted() {
        let plan_id = Uuid::new_v4();
        let mut plan_repo = MockPlanRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();

        plan_repo
            .expect_find_by_id()
            .returning(move |id| Ok(Some(plan(id))));
        subscription_repo
            .expect_count_active_for_plan()
            .returning(|_| Ok(0));
        plan_repo
            .expect_delete()
            .with(eq(plan_id))
            .times(1)
            .returning(|_| Ok(()));

        let usecase = PlanUseCase::new(
            Arc::new(plan_repo),
            Arc::new(subscription_repo),
            "BRL".to_string(),
        );

        usecase.delete(plan_id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_currency_falls_back_to_configured_default() {
        let mut plan_repo = MockPlanRepository::new();
        plan_repo
            .expect_create()
            .withf(|insert| insert.currency == "ARS" && insert.plan_type == "job")
            .times(1)
            .returning(|insert| {
                let mut created = plan(Uuid::new_v4());
                created.currency = insert.currency;
                created.plan_type = PlanType::Job;
                Ok(created)
            });

        let usecase = PlanUseCase::new(
            Arc::new(plan_repo),
            Arc::new(MockSubscriptionRepository::new()),
            "ARS".to_string(),
        );
        let dto = usecase
            .create(CreatePlanModel {
                name: "Vaga".to_string(),
                description: None,
                price_minor: 990,
                currency: None,
                duration_days: 15,
                plan_type: "job".to_string(),
                features: vec![],
                is_active: None,
            })
            .await
            .unwrap();

        assert_eq!(dto.currency, "ARS");
    }
}
