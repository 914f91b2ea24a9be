use std::sync::Arc;

use crates::{
    domain::{
        repositories::owned_resources::{ListingFilter, OwnedEntity, OwnedResourceRepository},
        value_objects::{
            enums::user_roles::UserRole,
            pagination::{Page, PageRequest},
        },
    },
    retry::{RetryOptions, with_retry},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::errors::{UseCaseError, UseCaseResult};

/// The authenticated user acting on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn may_modify<E: OwnedEntity>(&self, entity: &E) -> bool {
        self.is_admin() || entity.owner_id() == self.user_id
    }
}

fn may_view<E: OwnedEntity>(entity: &E, viewer: Option<Actor>) -> bool {
    entity.is_public() || viewer.is_some_and(|actor| actor.may_modify(entity))
}

/// CRUD with ownership rules for businesses, professionals, jobs, job
/// applications, blog posts and reviews.
pub struct OwnedResourceUseCase<R>
where
    R: OwnedResourceRepository + 'static,
{
    repo: Arc<R>,
    resource: &'static str,
    conflict_message: &'static str,
    read_retry: RetryOptions,
}

impl<R> OwnedResourceUseCase<R>
where
    R: OwnedResourceRepository + 'static,
{
    pub fn new(repo: Arc<R>, resource: &'static str, conflict_message: &'static str) -> Self {
        Self {
            repo,
            resource,
            conflict_message,
            read_retry: RetryOptions::default(),
        }
    }

    #[must_use]
    pub fn with_read_retry(mut self, options: RetryOptions) -> Self {
        self.read_retry = options;
        self
    }

    /// Anyone but an admin only sees approved or published rows.
    pub async fn list(
        &self,
        mut filter: R::Filter,
        page: PageRequest,
        viewer: Option<Actor>,
    ) -> UseCaseResult<Page<R::Entity>> {
        if !viewer.is_some_and(|actor| actor.is_admin()) {
            filter.restrict_to_public();
            filter.restrict_to_viewer(viewer.map(|actor| actor.user_id));
        }

        let page = with_retry(&self.read_retry, || self.repo.list(filter.clone(), page))
            .await
            .map_err(|err| {
                error!(resource = self.resource, db_error = ?err, "resources: list failed");
                UseCaseError::Internal(err)
            })?;

        info!(
            resource = self.resource,
            total = page.total,
            current_page = page.current_page,
            "resources: listed"
        );
        Ok(page)
    }

    /// Rows hidden from public lists are only found by their owner or an admin.
    pub async fn get(&self, id: Uuid, viewer: Option<Actor>) -> UseCaseResult<R::Entity> {
        let entity = self.load(id).await?;
        if !may_view(&entity, viewer) {
            return Err(UseCaseError::NotFound(self.resource));
        }
        Ok(entity)
    }

    async fn load(&self, id: Uuid) -> UseCaseResult<R::Entity> {
        with_retry(&self.read_retry, || self.repo.find_by_id(id))
            .await
            .map_err(|err| {
                error!(resource = self.resource, %id, db_error = ?err, "resources: lookup failed");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound(self.resource))
    }

    pub async fn create(&self, insert: R::Insert) -> UseCaseResult<R::Entity> {
        let entity = self.repo.create(insert).await.map_err(|err| {
            error!(resource = self.resource, db_error = ?err, "resources: create failed");
            UseCaseError::from_write(err, self.conflict_message)
        })?;

        info!(
            resource = self.resource,
            id = %entity.id(),
            owner_id = %entity.owner_id(),
            "resources: created"
        );
        Ok(entity)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: R::Changes,
        actor: Actor,
    ) -> UseCaseResult<R::Entity> {
        self.authorize(id, actor).await?;
        self.apply(id, changes).await
    }

    pub async fn delete(&self, id: Uuid, actor: Actor) -> UseCaseResult<()> {
        self.authorize(id, actor).await?;

        self.repo.delete(id).await.map_err(|err| {
            error!(resource = self.resource, %id, db_error = ?err, "resources: delete failed");
            UseCaseError::from_write(err, self.conflict_message)
        })?;

        info!(resource = self.resource, %id, user_id = %actor.user_id, "resources: deleted");
        Ok(())
    }

    /// Admin status changes. Route guards restrict who may call this.
    pub async fn moderate(&self, id: Uuid, changes: R::Changes) -> UseCaseResult<R::Entity> {
        self.load(id).await?;
        self.apply(id, changes).await
    }

    async fn authorize(&self, id: Uuid, actor: Actor) -> UseCaseResult<R::Entity> {
        let entity = self.load(id).await?;
        if !actor.may_modify(&entity) {
            warn!(
                resource = self.resource,
                %id,
                user_id = %actor.user_id,
                "resources: caller does not own resource"
            );
            return Err(UseCaseError::Forbidden(format!(
                "{} belongs to another user",
                self.resource
            )));
        }
        Ok(entity)
    }

    async fn apply(&self, id: Uuid, changes: R::Changes) -> UseCaseResult<R::Entity> {
        let entity = self.repo.update(id, changes).await.map_err(|err| {
            error!(resource = self.resource, %id, db_error = ?err, "resources: update failed");
            UseCaseError::from_write(err, self.conflict_message)
        })?;

        info!(resource = self.resource, %id, "resources: updated");
        Ok(entity)
    }
}
