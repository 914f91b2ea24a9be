pub mod identity_resolver;

use std::sync::Arc;

use axum::{
    Json, async_trait,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use crates::{
    domain::value_objects::enums::user_roles::UserRole, identity::verifier::IdentityFailure,
};
use tracing::warn;
use uuid::Uuid;

use crate::{axum_http::error_responses::ErrorResponse, usecases::owned_resources::Actor};

pub use identity_resolver::{IdentityResolution, IdentityResolver};

pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];
pub const CONTENT_EDITORS: &[UserRole] = &[UserRole::Admin, UserRole::Editor];

/// Local user resolved from the request's bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub external_id: String,
    pub role: UserRole,
    pub email: String,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Authentication that never rejects: failures leave the request anonymous.
#[derive(Debug, Clone, Default)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(AuthUser::actor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    Missing,
    Failed(IdentityFailure),
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthRejection::Missing => (StatusCode::UNAUTHORIZED, "missing credential".to_string()),
            AuthRejection::Failed(IdentityFailure::ProviderUnavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                IdentityFailure::ProviderUnavailable.to_string(),
            ),
            AuthRejection::Failed(failure) => (StatusCode::UNAUTHORIZED, failure.to_string()),
            AuthRejection::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                message,
                details: None,
            }),
        )
            .into_response()
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header. `Err` means
/// a header was sent but is not a usable bearer credential.
pub fn bearer_token(parts: &axum::http::HeaderMap) -> Result<Option<&str>, IdentityFailure> {
    let Some(value) = parts.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| IdentityFailure::Malformed)?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(IdentityFailure::Malformed),
    }
}

/// Resolves the bearer credential, when present, and records either the
/// `AuthUser` or the rejection in the request extensions.
pub async fn authenticate(
    State(resolver): State<Arc<dyn IdentityResolution>>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = match bearer_token(request.headers()) {
        Ok(None) => None,
        Ok(Some(token)) => Some(resolver.resolve(token).await),
        Err(failure) => Some(Err(AuthRejection::Failed(failure))),
    };

    match outcome {
        Some(Ok(user)) => {
            request.extensions_mut().insert(user);
        }
        Some(Err(rejection)) => {
            warn!(
                path = %request.uri().path(),
                rejection = ?rejection,
                "auth: credential rejected"
            );
            request.extensions_mut().insert(rejection);
        }
        None => {}
    }

    next.run(request).await
}

/// Route guard: 401 without an identity, 403 when the role is not allowed.
pub async fn require_roles(
    State(allowed): State<&'static [UserRole]>,
    request: Request,
    next: Next,
) -> Response {
    let role = match request.extensions().get::<AuthUser>() {
        Some(user) => user.role,
        None => return rejection_of(request.extensions()).into_response(),
    };

    if !allowed.contains(&role) {
        let status = StatusCode::FORBIDDEN;
        return (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                message: format!("role {role} may not access this resource"),
                details: None,
            }),
        )
            .into_response();
    }

    next.run(request).await
}

fn rejection_of(extensions: &axum::http::Extensions) -> AuthRejection {
    extensions
        .get::<AuthRejection>()
        .cloned()
        .unwrap_or(AuthRejection::Missing)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthUser>() {
            Some(user) => Ok(user.clone()),
            None => Err(rejection_of(&parts.extensions)),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}
