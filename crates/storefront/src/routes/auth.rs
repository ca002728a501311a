//! Authentication route handlers.
//!
//! Login state is a [`CurrentCustomer`] stored in the session; the cookie
//! is the only credential the client holds.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use deskly_core::{CustomerProfile, LoginRequest};

use super::ApiJson;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_customer, set_current_customer};
use crate::models::CurrentCustomer;
use crate::services::AuthService;
use crate::state::AppState;

/// Body of `POST /api/auth/register`.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn session_error(err: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}

async fn start_session(session: &Session, profile: &CustomerProfile) -> Result<()> {
    let current = CurrentCustomer::from(profile.clone());
    set_current_customer(session, &current)
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&profile.id, Some(profile.email.as_str()));
    Ok(())
}

/// Create an account and log it in.
#[instrument(skip(state, session, request))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<CustomerProfile>)> {
    let password = SecretString::from(request.password);
    let profile = AuthService::new(state.pool())
        .register(&request.email, &request.name, &password)
        .await?;

    start_session(&session, &profile).await?;
    info!(customer_id = %profile.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Log in with email and password.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<CustomerProfile>> {
    let password = SecretString::from(request.password);
    let profile = AuthService::new(state.pool())
        .login(&request.email, &password)
        .await?;

    start_session(&session, &profile).await?;
    info!(customer_id = %profile.id, "Customer logged in");
    Ok(Json(profile))
}

/// Log out. Succeeds without a session too.
#[instrument(skip(session, auth))]
pub async fn logout(session: Session, OptionalAuth(auth): OptionalAuth) -> Result<StatusCode> {
    clear_current_customer(&session)
        .await
        .map_err(|e| session_error(&e))?;
    session.flush().await.map_err(|e| session_error(&e))?;
    clear_sentry_user();

    if let Some(customer) = auth {
        info!(customer_id = %customer.id, "Customer logged out");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in customer.
pub async fn me(RequireAuth(customer): RequireAuth) -> Json<CustomerProfile> {
    Json(customer.into())
}
