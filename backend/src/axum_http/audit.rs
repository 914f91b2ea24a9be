use axum::{extract::Request, http::Method, middleware::Next, response::Response};
use tracing::info;

use crate::auth::AuthUser;

fn is_mutation(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Emits an `audit` record for every successful mutating request.
pub async fn audit_mutations(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    if !is_mutation(&method) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let actor = request.extensions().get::<AuthUser>().cloned();
    let response = next.run(request).await;

    if response.status().is_success() {
        match actor {
            Some(actor) => info!(
                target: "audit",
                %method,
                path,
                status = response.status().as_u16(),
                user_id = %actor.user_id,
                role = %actor.role,
                "audit: mutation applied"
            ),
            None => info!(
                target: "audit",
                %method,
                path,
                status = response.status().as_u16(),
                "audit: mutation applied"
            ),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_writes_are_audited() {
        assert!(is_mutation(&Method::POST));
        assert!(is_mutation(&Method::DELETE));
        assert!(!is_mutation(&Method::GET));
        assert!(!is_mutation(&Method::OPTIONS));
    }
}
