use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::{
    entities::users::{UpdateUserEntity, UserEntity},
    value_objects::{
        enums::{user_roles::UserRole, user_statuses::UserStatus},
        validation::{invalid, known_user_role, known_user_status},
    },
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for UserDto {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            role: value.role(),
            status: value.status(),
            name: value.name,
            email: value.email,
            is_active: value.is_active,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "role_or_status", skip_on_field_errors = false))]
pub struct UpdateUserAccessModel {
    #[validate(custom(function = "known_user_role"))]
    pub role: Option<String>,
    #[validate(custom(function = "known_user_status"))]
    pub status: Option<String>,
}

fn role_or_status(model: &UpdateUserAccessModel) -> Result<(), ValidationError> {
    if model.role.is_none() && model.status.is_none() {
        return Err(invalid("role", "role or status is required"));
    }
    Ok(())
}

impl UpdateUserAccessModel {
    pub fn to_entity(&self) -> UpdateUserEntity {
        UpdateUserEntity {
            role: self.role.clone(),
            status: self.status.clone(),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}

/// Identity details as known by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUserProfile {
    pub external_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}
