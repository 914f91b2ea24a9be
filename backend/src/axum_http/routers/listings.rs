use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use crates::{
    domain::{
        repositories::owned_resources::OwnedResourceRepository,
        value_objects::{
            blog_posts::{BlogPostQuery, CreateBlogPostModel, UpdateBlogPostModel},
            businesses::{BusinessQuery, CreateBusinessModel, UpdateBusinessModel},
            enums::{
                listing_statuses::{ListingStatus, PostStatus, ReviewStatus},
                user_roles::UserRole,
            },
            job_applications::{
                CreateJobApplicationModel, JobApplicationQuery, UpdateJobApplicationModel,
            },
            jobs::{CreateJobModel, JobQuery, UpdateJobModel},
            pagination::PageRequest,
            professionals::{CreateProfessionalModel, ProfessionalQuery, UpdateProfessionalModel},
            reviews::{CreateReviewModel, ReviewQuery, UpdateReviewModel},
        },
    },
    infra::db::repositories::{
        blog_posts::BlogPostPostgres, businesses::BusinessPostgres,
        job_applications::JobApplicationPostgres, jobs::JobPostgres,
        professionals::ProfessionalPostgres, reviews::ReviewPostgres,
    },
};
use crates::domain::entities::{
    blog_posts::UpdateBlogPostEntity, businesses::UpdateBusinessEntity,
    professionals::UpdateProfessionalEntity, reviews::UpdateReviewEntity,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthUser, CONTENT_EDITORS, MaybeAuthUser},
    axum_http::{error_responses::AppError, validated_json::ValidatedJson},
    usecases::{errors::UseCaseError, owned_resources::OwnedResourceUseCase},
};

type Changes<K> = <<K as ListingKind>::Repo as OwnedResourceRepository>::Changes;

/// Binds one listing resource's HTTP models to its repository.
pub trait ListingKind: Sized + Send + Sync + 'static {
    type Repo: OwnedResourceRepository + 'static;
    type Query: DeserializeOwned + Send + 'static;
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;

    const NAME: &'static str;
    const CONFLICT: &'static str;
    /// Roles allowed to create; `None` lets any signed-in user create.
    const CREATE_ROLES: Option<&'static [UserRole]> = None;

    fn page(query: &Self::Query) -> PageRequest;
    fn filter(query: &Self::Query) -> <Self::Repo as OwnedResourceRepository>::Filter;
    fn insert(model: &Self::Create, owner_id: Uuid)
    -> <Self::Repo as OwnedResourceRepository>::Insert;
    fn changes(model: &Self::Update) -> Changes<Self>;
}

/// Listings whose visibility an admin decides.
pub trait Moderated: ListingKind {
    type Status: DeserializeOwned + Send + 'static;

    fn moderation(status: Self::Status) -> Changes<Self>;
}

#[derive(Debug, Deserialize)]
pub struct ModerationModel<S> {
    pub status: S,
}

pub fn usecase<K: ListingKind>(repo: Arc<K::Repo>) -> OwnedResourceUseCase<K::Repo> {
    OwnedResourceUseCase::new(repo, K::NAME, K::CONFLICT)
}

pub fn routes<K>(repo: Arc<K::Repo>) -> Router
where
    K: ListingKind,
    <K::Repo as OwnedResourceRepository>::Entity: Serialize,
{
    Router::new()
        .route("/", get(list::<K>).post(create::<K>))
        .route(
            "/:id",
            get(find::<K>).put(update::<K>).delete(remove::<K>),
        )
        .with_state(Arc::new(usecase::<K>(repo)))
}

/// Admin-only status route, nested under `/admin/<resource>`.
pub fn moderation_routes<K>(repo: Arc<K::Repo>) -> Router
where
    K: Moderated,
    <K::Repo as OwnedResourceRepository>::Entity: Serialize,
{
    Router::new()
        .route("/:id/status", patch(moderate::<K>))
        .with_state(Arc::new(usecase::<K>(repo)))
}

pub async fn list<K>(
    State(usecase): State<Arc<OwnedResourceUseCase<K::Repo>>>,
    viewer: MaybeAuthUser,
    Query(query): Query<K::Query>,
) -> impl IntoResponse
where
    K: ListingKind,
    <K::Repo as OwnedResourceRepository>::Entity: Serialize,
{
    match usecase
        .list(K::filter(&query), K::page(&query), viewer.actor())
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn find<K>(
    State(usecase): State<Arc<OwnedResourceUseCase<K::Repo>>>,
    viewer: MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse
where
    K: ListingKind,
    <K::Repo as OwnedResourceRepository>::Entity: Serialize,
{
    match usecase.get(id, viewer.actor()).await {
        Ok(entity) => Json(entity).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn create<K>(
    State(usecase): State<Arc<OwnedResourceUseCase<K::Repo>>>,
    auth: AuthUser,
    ValidatedJson(model): ValidatedJson<K::Create>,
) -> impl IntoResponse
where
    K: ListingKind,
    <K::Repo as OwnedResourceRepository>::Entity: Serialize,
{
    if let Some(roles) = K::CREATE_ROLES {
        if !roles.contains(&auth.role) {
            warn!(user_id = %auth.user_id, resource = K::NAME, "listings: role may not create");
            return AppError::from(UseCaseError::Forbidden(format!(
                "role {} may not create a {}",
                auth.role,
                K::NAME
            )))
            .into_response();
        }
    }

    info!(user_id = %auth.user_id, resource = K::NAME, "listings: create request received");
    match usecase.create(K::insert(&model, auth.user_id)).await {
        Ok(entity) => (StatusCode::CREATED, Json(entity)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update<K>(
    State(usecase): State<Arc<OwnedResourceUseCase<K::Repo>>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(model): ValidatedJson<K::Update>,
) -> impl IntoResponse
where
    K: ListingKind,
    <K::Repo as OwnedResourceRepository>::Entity: Serialize,
{
    match usecase.update(id, K::changes(&model), auth.actor()).await {
        Ok(entity) => Json(entity).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn remove<K>(
    State(usecase): State<Arc<OwnedResourceUseCase<K::Repo>>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse
where
    K: ListingKind,
{
    match usecase.delete(id, auth.actor()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn moderate<K>(
    State(usecase): State<Arc<OwnedResourceUseCase<K::Repo>>>,
    Path(id): Path<Uuid>,
    Json(model): Json<ModerationModel<K::Status>>,
) -> impl IntoResponse
where
    K: Moderated,
    <K::Repo as OwnedResourceRepository>::Entity: Serialize,
{
    match usecase.moderate(id, K::moderation(model.status)).await {
        Ok(entity) => Json(entity).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub struct Businesses;
pub struct Professionals;
pub struct Jobs;
pub struct JobApplications;
pub struct BlogPosts;
pub struct Reviews;

impl ListingKind for Businesses {
    type Repo = BusinessPostgres;
    type Query = BusinessQuery;
    type Create = CreateBusinessModel;
    type Update = UpdateBusinessModel;

    const NAME: &'static str = "business";
    const CONFLICT: &'static str = "business already exists";

    fn page(query: &Self::Query) -> PageRequest {
        query.page()
    }

    fn filter(query: &Self::Query) -> <Self::Repo as OwnedResourceRepository>::Filter {
        query.filter()
    }

    fn insert(
        model: &Self::Create,
        owner_id: Uuid,
    ) -> <Self::Repo as OwnedResourceRepository>::Insert {
        model.to_entity(owner_id)
    }

    fn changes(model: &Self::Update) -> Changes<Self> {
        model.to_entity()
    }
}

impl Moderated for Businesses {
    type Status = ListingStatus;

    fn moderation(status: Self::Status) -> Changes<Self> {
        UpdateBusinessEntity::moderation(status)
    }
}

impl ListingKind for Professionals {
    type Repo = ProfessionalPostgres;
    type Query = ProfessionalQuery;
    type Create = CreateProfessionalModel;
    type Update = UpdateProfessionalModel;

    const NAME: &'static str = "professional";
    const CONFLICT: &'static str = "professional profile already exists";

    fn page(query: &Self::Query) -> PageRequest {
        query.page()
    }

    fn filter(query: &Self::Query) -> <Self::Repo as OwnedResourceRepository>::Filter {
        query.filter()
    }

    fn insert(
        model: &Self::Create,
        owner_id: Uuid,
    ) -> <Self::Repo as OwnedResourceRepository>::Insert {
        model.to_entity(owner_id)
    }

    fn changes(model: &Self::Update) -> Changes<Self> {
        model.to_entity()
    }
}

impl Moderated for Professionals {
    type Status = ListingStatus;

    fn moderation(status: Self::Status) -> Changes<Self> {
        UpdateProfessionalEntity::moderation(status)
    }
}

impl ListingKind for Jobs {
    type Repo = JobPostgres;
    type Query = JobQuery;
    type Create = CreateJobModel;
    type Update = UpdateJobModel;

    const NAME: &'static str = "job";
    const CONFLICT: &'static str = "job already exists";

    fn page(query: &Self::Query) -> PageRequest {
        query.page()
    }

    fn filter(query: &Self::Query) -> <Self::Repo as OwnedResourceRepository>::Filter {
        query.filter()
    }

    fn insert(
        model: &Self::Create,
        owner_id: Uuid,
    ) -> <Self::Repo as OwnedResourceRepository>::Insert {
        model.to_entity(owner_id)
    }

    fn changes(model: &Self::Update) -> Changes<Self> {
        model.to_entity()
    }
}

/// Applicants apply, edit and withdraw; job owners see applications to their
/// postings in the list.
impl ListingKind for JobApplications {
    type Repo = JobApplicationPostgres;
    type Query = JobApplicationQuery;
    type Create = CreateJobApplicationModel;
    type Update = UpdateJobApplicationModel;

    const NAME: &'static str = "job application";
    const CONFLICT: &'static str = "you already applied to this job";

    fn page(query: &Self::Query) -> PageRequest {
        query.page()
    }

    fn filter(query: &Self::Query) -> <Self::Repo as OwnedResourceRepository>::Filter {
        query.filter()
    }

    fn insert(
        model: &Self::Create,
        owner_id: Uuid,
    ) -> <Self::Repo as OwnedResourceRepository>::Insert {
        model.to_entity(owner_id)
    }

    fn changes(model: &Self::Update) -> Changes<Self> {
        model.to_entity()
    }
}

impl ListingKind for BlogPosts {
    type Repo = BlogPostPostgres;
    type Query = BlogPostQuery;
    type Create = CreateBlogPostModel;
    type Update = UpdateBlogPostModel;

    const NAME: &'static str = "blog post";
    const CONFLICT: &'static str = "slug already in use";
    const CREATE_ROLES: Option<&'static [UserRole]> = Some(CONTENT_EDITORS);

    fn page(query: &Self::Query) -> PageRequest {
        query.page()
    }

    fn filter(query: &Self::Query) -> <Self::Repo as OwnedResourceRepository>::Filter {
        query.filter()
    }

    fn insert(
        model: &Self::Create,
        owner_id: Uuid,
    ) -> <Self::Repo as OwnedResourceRepository>::Insert {
        model.to_entity(owner_id)
    }

    fn changes(model: &Self::Update) -> Changes<Self> {
        model.to_entity()
    }
}

impl Moderated for BlogPosts {
    type Status = PostStatus;

    fn moderation(status: Self::Status) -> Changes<Self> {
        UpdateBlogPostEntity::moderation(status)
    }
}

impl ListingKind for Reviews {
    type Repo = ReviewPostgres;
    type Query = ReviewQuery;
    type Create = CreateReviewModel;
    type Update = UpdateReviewModel;

    const NAME: &'static str = "review";
    const CONFLICT: &'static str = "you already reviewed this listing";

    fn page(query: &Self::Query) -> PageRequest {
        query.page()
    }

    fn filter(query: &Self::Query) -> <Self::Repo as OwnedResourceRepository>::Filter {
        query.filter()
    }

    fn insert(
        model: &Self::Create,
        owner_id: Uuid,
    ) -> <Self::Repo as OwnedResourceRepository>::Insert {
        model.to_entity(owner_id)
    }

    fn changes(model: &Self::Update) -> Changes<Self> {
        model.to_entity()
    }
}

impl Moderated for Reviews {
    type Status = ReviewStatus;

    fn moderation(status: Self::Status) -> Changes<Self> {
        UpdateReviewEntity::moderation(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        extract::Request,
        http::{Request as HttpRequest, header::CONTENT_TYPE},
        middleware::{Next, from_fn},
        response::Response,
    };
    use axum::body::to_bytes;
    use crates::domain::{
        repositories::{
            constraint_violations::ConstraintViolation,
            owned_resources::{ListingFilter, OwnedEntity},
        },
        value_objects::{pagination::Page, validation::not_blank},
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    const OWNER: Uuid = Uuid::from_u128(1);
    const STRANGER: Uuid = Uuid::from_u128(2);

    #[derive(Debug, Clone, Serialize)]
    struct Note {
        id: Uuid,
        owner_id: Uuid,
        body: String,
    }

    impl OwnedEntity for Note {
        fn id(&self) -> Uuid {
            self.id
        }

        fn owner_id(&self) -> Uuid {
            self.owner_id
        }

        fn is_public(&self) -> bool {
            !self.body.starts_with("draft")
        }
    }

    #[derive(Debug, Clone, Default)]
    struct NoteFilter;

    impl ListingFilter for NoteFilter {
        fn restrict_to_public(&mut self) {}
    }

    #[derive(Debug, Deserialize)]
    struct NoteQuery {}

    #[derive(Debug, Deserialize, Validate)]
    struct NoteModel {
        #[validate(custom(function = "not_blank"), length(max = 20))]
        body: String,
    }

    #[derive(Default)]
    struct NoteStore {
        notes: Mutex<Vec<Note>>,
    }

    #[async_trait]
    impl OwnedResourceRepository for NoteStore {
        type Entity = Note;
        type Insert = Note;
        type Changes = String;
        type Filter = NoteFilter;

        async fn list(&self, _filter: NoteFilter, page: PageRequest) -> Result<Page<Note>> {
            let notes = self.notes.lock().unwrap().clone();
            let total = notes.len() as i64;
            Ok(Page::new(notes, total, page))
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Note>> {
            Ok(self.notes.lock().unwrap().iter().find(|n| n.id == id).cloned())
        }

        async fn create(&self, insert: Note) -> Result<Note> {
            let mut notes = self.notes.lock().unwrap();
            if notes
                .iter()
                .any(|n| n.owner_id == insert.owner_id && n.body == insert.body)
            {
                return Err(anyhow::Error::new(ConstraintViolation::Unique(
                    "notes_owner_body_key".to_string(),
                )));
            }
            notes.push(insert.clone());
            Ok(insert)
        }

        async fn update(&self, id: Uuid, body: String) -> Result<Note> {
            let mut notes = self.notes.lock().unwrap();
            let note = notes.iter_mut().find(|n| n.id == id).unwrap();
            note.body = body;
            Ok(note.clone())
        }

        async fn delete(&self, id: Uuid) -> Result<()> {
            self.notes.lock().unwrap().retain(|n| n.id != id);
            Ok(())
        }
    }

    struct Notes;

    impl ListingKind for Notes {
        type Repo = NoteStore;
        type Query = NoteQuery;
        type Create = NoteModel;
        type Update = NoteModel;

        const NAME: &'static str = "note";
        const CONFLICT: &'static str = "duplicate note";

        fn page(_query: &NoteQuery) -> PageRequest {
            PageRequest::default()
        }

        fn filter(_query: &NoteQuery) -> NoteFilter {
            NoteFilter
        }

        fn insert(model: &NoteModel, owner_id: Uuid) -> Note {
            Note {
                id: Uuid::new_v4(),
                owner_id,
                body: model.body.clone(),
            }
        }

        fn changes(model: &NoteModel) -> String {
            model.body.clone()
        }
    }

    /// Stands in for the authenticate layer: `x-test-user` becomes the caller.
    async fn test_identity(mut request: Request, next: Next) -> Response {
        let user_id = request
            .headers()
            .get("x-test-user")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(user_id) = user_id {
            request.extensions_mut().insert(AuthUser {
                user_id,
                external_id: "user_test".to_string(),
                role: UserRole::User,
                email: "test@example.com".to_string(),
            });
        }
        next.run(request).await
    }

    fn app(store: Arc<NoteStore>) -> Router {
        routes::<Notes>(store).layer(from_fn(test_identity))
    }

    fn request(method: &str, uri: String, user: Option<Uuid>, body: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-test-user", user.to_string());
        }
        match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn anonymous_create_is_unauthorized() {
        let response = app(Arc::default())
            .oneshot(request("POST", "/".into(), None, Some(r#"{"body":"hi"}"#)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_body_is_rejected_before_storage() {
        let store = Arc::new(NoteStore::default());
        let response = app(store.clone())
            .oneshot(request("POST", "/".into(), Some(OWNER), Some(r#"{"body":"  "}"#)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.notes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_owner_may_update() {
        let store = Arc::new(NoteStore::default());
        let id = Uuid::new_v4();
        store.notes.lock().unwrap().push(Note {
            id,
            owner_id: OWNER,
            body: "draft".to_string(),
        });

        let stranger = app(store.clone())
            .oneshot(request("PUT", format!("/{id}"), Some(STRANGER), Some(r#"{"body":"x"}"#)))
            .await
            .unwrap();
        assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

        let owner = app(store.clone())
            .oneshot(request("PUT", format!("/{id}"), Some(OWNER), Some(r#"{"body":"final"}"#)))
            .await
            .unwrap();
        assert_eq!(owner.status(), StatusCode::OK);
        assert_eq!(store.notes.lock().unwrap()[0].body, "final");
    }

    #[tokio::test]
    async fn missing_listing_is_not_found() {
        let response = app(Arc::default())
            .oneshot(request("GET", format!("/{}", Uuid::new_v4()), None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn repeated_create_by_the_same_user_conflicts() {
        let store = Arc::new(NoteStore::default());
        let first = app(store.clone())
            .oneshot(request("POST", "/".into(), Some(OWNER), Some(r#"{"body":"hello"}"#)))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app(store.clone())
            .oneshot(request("POST", "/".into(), Some(OWNER), Some(r#"{"body":"hello"}"#)))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let bytes = to_bytes(second.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "duplicate note");
        assert_eq!(store.notes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn hidden_row_is_only_found_by_its_owner() {
        let store = Arc::new(NoteStore::default());
        let id = Uuid::new_v4();
        store.notes.lock().unwrap().push(Note {
            id,
            owner_id: OWNER,
            body: "draft: pending review".to_string(),
        });

        let anonymous = app(store.clone())
            .oneshot(request("GET", format!("/{id}"), None, None))
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

        let stranger = app(store.clone())
            .oneshot(request("GET", format!("/{id}"), Some(STRANGER), None))
            .await
            .unwrap();
        assert_eq!(stranger.status(), StatusCode::NOT_FOUND);

        let owner = app(store.clone())
            .oneshot(request("GET", format!("/{id}"), Some(OWNER), None))
            .await
            .unwrap();
        assert_eq!(owner.status(), StatusCode::OK);
    }
}
