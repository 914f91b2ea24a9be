use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::value_objects::pagination::{Page, PageRequest};

/// A row that belongs to the user who created it.
pub trait OwnedEntity {
    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;

    /// Rows that list filters keep for anonymous visitors.
    fn is_public(&self) -> bool {
        true
    }
}

/// Listing filters know which rows anonymous visitors may see.
pub trait ListingFilter {
    fn restrict_to_public(&mut self);

    /// Further narrows a non-admin listing to rows tied to the viewer.
    fn restrict_to_viewer(&mut self, _viewer: Option<Uuid>) {}
}

/// Storage contract shared by businesses, professionals, jobs, job
/// applications, blog posts and reviews.
#[async_trait]
pub trait OwnedResourceRepository: Send + Sync {
    type Entity: OwnedEntity + Clone + Send + Sync + 'static;
    type Insert: Send + 'static;
    type Changes: Send + 'static;
    type Filter: ListingFilter + Clone + Send + Sync + 'static;

    async fn list(&self, filter: Self::Filter, page: PageRequest) -> Result<Page<Self::Entity>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Self::Entity>>;
    async fn create(&self, insert: Self::Insert) -> Result<Self::Entity>;
    async fn update(&self, id: Uuid, changes: Self::Changes) -> Result<Self::Entity>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}
