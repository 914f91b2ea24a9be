use std::sync::Arc;

use crates::domain::{
    repositories::users::UserRepository,
    value_objects::{
        enums::user_roles::UserRole,
        users::{UpdateUserAccessModel, UserDto},
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::errors::{UseCaseError, UseCaseResult};

pub struct UserUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
}

impl<U> UserUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn me(&self, user_id: Uuid) -> UseCaseResult<UserDto> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to load user");
                UseCaseError::Internal(err)
            })?
            .map(UserDto::from)
            .ok_or(UseCaseError::NotFound("user"))
    }

    /// Admin change of a user's role and/or approval status.
    pub async fn update_access(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        model: UpdateUserAccessModel,
    ) -> UseCaseResult<UserDto> {
        let target = self.me(user_id).await?;

        let demotes_self = admin_id == user_id
            && target.role == UserRole::Admin
            && model
                .role
                .as_deref()
                .is_some_and(|role| role != UserRole::Admin.as_str());
        if demotes_self {
            warn!(%admin_id, "users: admin tried to drop own admin role");
            return Err(UseCaseError::BadRequest(
                "admins cannot remove their own admin role".to_string(),
            ));
        }

        let user = self
            .user_repo
            .update(user_id, model.to_entity())
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to update access");
                UseCaseError::Internal(err)
            })?;

        info!(
            %admin_id,
            %user_id,
            role = %user.role,
            status = %user.status,
            "users: access updated"
        );
        Ok(UserDto::from(user))
    }
}
