//! Authentication middleware and extractors for admin.
//!
//! Provides extractors for requiring operator authentication in route
//! handlers. Rejections are JSON error bodies.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use deskly_core::ErrorBody;
use tower_sessions::Session;

use crate::models::{CurrentAdmin, session_keys};

/// Extractor that requires operator authentication (any role).
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Extractor that requires an operator allowed to change order statuses.
///
/// Viewers get 403.
pub struct RequireOrderWriter(pub CurrentAdmin);

/// Error returned when authentication or a role is missing.
pub enum AdminAuthRejection {
    Unauthorized { path: String },
    Forbidden { path: String },
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Unauthorized { path } => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(401, "Unauthorized", "Login required").with_path(path),
            ),
            Self::Forbidden { path } => (
                StatusCode::FORBIDDEN,
                ErrorBody::new(403, "Forbidden", "Your role cannot change orders")
                    .with_path(path),
            ),
        };
        (status, Json(body)).into_response()
    }
}

async fn current_admin(parts: &Parts) -> Option<CurrentAdmin> {
    // Session is set by SessionManagerLayer
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_admin(parts)
            .await
            .map(Self)
            .ok_or_else(|| AdminAuthRejection::Unauthorized {
                path: parts.uri.path().to_string(),
            })
    }
}

impl<S> FromRequestParts<S> for RequireOrderWriter
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAdminAuth(admin) = RequireAdminAuth::from_request_parts(parts, state).await?;

        if !admin.role.can_update_orders() {
            tracing::warn!(
                admin_id = %admin.id,
                role = %admin.role,
                "Status change refused for read-only role"
            );
            return Err(AdminAuthRejection::Forbidden {
                path: parts.uri.path().to_string(),
            });
        }
        Ok(Self(admin))
    }
}

/// Extractor that optionally gets the current operator.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_admin(parts).await))
    }
}

/// Store the operator in the session, cycling the session ID first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// End the operator's session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
