//! Operator authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::SecretString;
use tower_sessions::Session;
use tracing::{info, instrument};

use deskly_core::{BackofficeUser, LoginRequest};

use super::ApiJson;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::services::AdminAuthService;
use crate::state::AppState;

fn session_error(err: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}

/// Log in with email and password.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<BackofficeUser>> {
    let password = SecretString::from(request.password);
    let user = AdminAuthService::new(state.pool())
        .login(&request.email, &password)
        .await?;

    set_current_admin(&session, &CurrentAdmin::from(user.clone()))
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    info!(admin_id = %user.id, role = %user.role, "Operator logged in");
    Ok(Json(user))
}

/// Log out. Succeeds without a session too.
#[instrument(skip(session, auth))]
pub async fn logout(session: Session, OptionalAdminAuth(auth): OptionalAdminAuth) -> Result<StatusCode> {
    clear_current_admin(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();

    if let Some(admin) = auth {
        info!(admin_id = %admin.id, "Operator logged out");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in operator.
pub async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<BackofficeUser> {
    Json(admin.into())
}
