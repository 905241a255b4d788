//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::routes::error_response;
use claimflow_core::approval::Role;
use claimflow_db::repositories::Actor;
use claimflow_shared::{AppError, Claims};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates bearer tokens.
///
/// Extracts the token from the Authorization header, validates it, and
/// stores the claims in request extensions for handlers to access.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return error_response(&AppError::Unauthorized(
            "Authorization header with Bearer token is required".to_string(),
        ));
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let details = match e {
                claimflow_shared::JwtError::Expired => "Token has expired",
                _ => "Invalid or malformed token",
            };

            error_response(&AppError::Unauthorized(details.to_string()))
        }
    }
}

/// Extractor for the authenticated principal.
///
/// Use this in handlers to get the caller's identity:
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let actor = auth.actor()?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub fn user_id(&self) -> uuid::Uuid {
        self.0.user_id()
    }

    /// Returns the company ID from the claims.
    #[must_use]
    pub fn company_id(&self) -> uuid::Uuid {
        self.0.company_id()
    }

    /// Returns the repository-facing actor for this principal.
    ///
    /// # Errors
    ///
    /// Returns a 401 response when the token carries an unknown role.
    pub fn actor(&self) -> Result<Actor, Response> {
        let role = Role::parse(&self.0.role).ok_or_else(|| {
            error_response(&AppError::Unauthorized(
                "Token carries an unknown role".to_string(),
            ))
        })?;

        Ok(Actor {
            user_id: self.0.user_id(),
            company_id: self.0.company_id(),
            role,
        })
    }

    /// Returns true when the principal is a company admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        Role::parse(&self.0.role) == Some(Role::Admin)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                error_response(&AppError::Unauthorized("Authentication required".to_string()))
            })
    }
}
