//! Account handlers: register, login, logout, verification, password reset.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::MessageResponse;
use crate::routes::extract::ApiJson;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// The logged-in account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

fn auth_service(state: &AppState) -> AuthService<'_> {
    AuthService::new(state.pool(), state.email(), &state.config().frontend_url)
}

/// POST /api/auth/register
///
/// Creates an unverified account. The user must follow the emailed link
/// before they can log in.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    auth_service(&state)
        .register(&body.name, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Account created. Check your email to verify your address",
        )),
    ))
}

/// POST /api/auth/login
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = auth_service(&state).login(&body.email, &body.password).await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(UserResponse { user }))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<Json<MessageResponse>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(MessageResponse::new("Logged out")))
}

/// GET /api/auth/me
///
/// Reloads the account so `is_admin` and verification state are current.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserResponse>> {
    let Some(user) = UserRepository::new(state.pool()).get_by_id(current.id).await? else {
        clear_current_user(&session).await?;
        return Err(AppError::Unauthorized("Authentication required".to_string()));
    };
    Ok(Json(UserResponse { user }))
}

/// POST /api/auth/verify-email
#[instrument(skip(state, body))]
pub async fn verify_email(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state).verify_email(&body.token).await?;
    Ok(Json(MessageResponse::new("Email verified, you can now log in")))
}

/// POST /api/auth/resend-verification
#[instrument(skip(state, body))]
pub async fn resend_verification(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state).resend_verification(&body.email).await?;
    Ok(Json(MessageResponse::new(
        "If an account exists for this address, a new link is on its way",
    )))
}

/// POST /api/auth/forgot-password
#[instrument(skip(state, body))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state).forgot_password(&body.email).await?;
    Ok(Json(MessageResponse::new(
        "If an account exists for this address, a reset link is on its way",
    )))
}

/// POST /api/auth/reset-password
#[instrument(skip(state, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state)
        .reset_password(&body.token, &body.password)
        .await?;
    Ok(Json(MessageResponse::new(
        "Password updated, you can now log in",
    )))
}
