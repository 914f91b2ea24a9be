use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{InsertUserEntity, UpdateUserEntity, UserEntity};

#[automock]
#[async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;
    async fn find_by_external_id(&self, external_id: String) -> Result<Option<UserEntity>>;
    async fn find_by_email(&self, email: String) -> Result<Option<UserEntity>>;
    async fn create(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity>;
    async fn update(&self, user_id: Uuid, changes: UpdateUserEntity) -> Result<UserEntity>;
    async fn count(&self) -> Result<i64>;
}
