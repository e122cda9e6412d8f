use axum::{extract::State, Extension};
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::info;

use crate::handlers::JsonBody;
use crate::middleware::{remove_session, ApiResponse, ApiResult, Successful};
use crate::state::AppState;
use crate::user::{UserData, UserSessionData};
use crate::validation::{validate_password, validate_verification_code, FieldErrors};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub verification_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// GET /v1/user - the signed-in user's account
pub async fn get_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSessionData>,
) -> ApiResult<UserData> {
    let user = state.user_manager.get_user_data(&session.access_token).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /v1/user - delete the account and clear the session cookies
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(session): Extension<UserSessionData>,
    cookies: Cookies,
) -> ApiResult<Successful> {
    state.user_manager.delete_user(&session.access_token).await?;
    remove_session(&cookies);
    info!("User deleted their account");
    Ok(ApiResponse::success(Successful::yes()))
}

/// POST /v1/user/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(session): Extension<UserSessionData>,
    JsonBody(request): JsonBody<VerifyEmailRequest>,
) -> ApiResult<UserData> {
    let mut errors = FieldErrors::new();
    validate_verification_code(&mut errors, &request.verification_code);
    errors.into_result()?;

    state
        .user_manager
        .verify_email(&session.access_token, &request.verification_code)
        .await?;
    let user = state.user_manager.get_user_data(&session.access_token).await?;
    Ok(ApiResponse::success(user))
}

/// POST /v1/user/send-verification-email
pub async fn send_verification_email(
    State(state): State<AppState>,
    Extension(session): Extension<UserSessionData>,
) -> ApiResult<UserData> {
    state.user_manager.send_verification_email(&session.access_token).await?;
    let user = state.user_manager.get_user_data(&session.access_token).await?;
    Ok(ApiResponse::success(user))
}

/// POST /v1/user/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<UserSessionData>,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> ApiResult<UserData> {
    let mut errors = FieldErrors::new();
    validate_password(&mut errors, "currentPassword", &request.current_password);
    validate_password(&mut errors, "newPassword", &request.new_password);
    errors.into_result()?;

    state
        .user_manager
        .change_password(&session.access_token, &request.current_password, &request.new_password)
        .await?;
    let user = state.user_manager.get_user_data(&session.access_token).await?;
    Ok(ApiResponse::success(user))
}
