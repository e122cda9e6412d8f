use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::info;

use crate::handlers::JsonBody;
use crate::middleware::{read_session, remove_session, write_session, ApiResponse, ApiResult, Successful};
use crate::state::AppState;
use crate::user::Alias;
use crate::validation::{
    validate_email, validate_password, validate_username, validate_verification_code, FieldErrors,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserResult {
    pub username: String,
    pub email: String,
}

/// Names an account by exactly one of username or email
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInUserRequest {
    #[serde(flatten)]
    pub alias: AliasRequest,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(flatten)]
    pub alias: AliasRequest,
    pub verification_code: String,
    pub new_password: String,
}

impl AliasRequest {
    fn to_alias(&self, errors: &mut FieldErrors) -> Option<Alias> {
        match (&self.username, &self.email) {
            (Some(username), None) => {
                validate_username(errors, username);
                Some(Alias::username(username.clone()))
            }
            (None, Some(email)) => {
                validate_email(errors, email);
                Some(Alias::email(email.clone()))
            }
            _ => {
                errors.add("username", "Exactly one of username or email must be provided.");
                None
            }
        }
    }

    fn validate(&self) -> Result<Alias, FieldErrors> {
        let mut errors = FieldErrors::new();
        let alias = self.to_alias(&mut errors);
        errors.into_result()?;
        alias.ok_or_else(FieldErrors::new)
    }
}

/// POST /v1/user/register - create an account and send its verification code
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterUserRequest>,
) -> ApiResult<RegisterUserResult> {
    let mut errors = FieldErrors::new();
    validate_username(&mut errors, &request.username);
    validate_email(&mut errors, &request.email);
    validate_password(&mut errors, "password", &request.password);
    errors.into_result()?;

    let user = state
        .user_manager
        .register(&request.username, &request.email, &request.password)
        .await?;
    Ok(ApiResponse::success(RegisterUserResult {
        username: user.username,
        email: user.email,
    }))
}

/// POST /v1/user/sign-in - set the session cookies
pub async fn sign_in(
    State(state): State<AppState>,
    cookies: Cookies,
    JsonBody(request): JsonBody<SignInUserRequest>,
) -> ApiResult<Successful> {
    let mut errors = FieldErrors::new();
    let alias = request.alias.to_alias(&mut errors);
    validate_password(&mut errors, "password", &request.password);
    errors.into_result()?;
    let alias = alias.ok_or_else(FieldErrors::new)?;

    let session = state.user_manager.sign_in(&alias, &request.password).await?;
    write_session(&cookies, &session, state.config.security.secure_cookies);
    Ok(ApiResponse::success(Successful::yes()))
}

/// POST /v1/user/sign-out - end the session if there is one; cookies are always cleared
pub async fn sign_out(State(state): State<AppState>, cookies: Cookies) -> ApiResult<Successful> {
    if let Some(session) = read_session(&cookies) {
        if let Ok(true) = state.user_manager.is_signed_in(&session.access_token).await {
            state.user_manager.sign_out(&session.access_token).await?;
            info!("User signed out");
        }
    }
    remove_session(&cookies);
    Ok(ApiResponse::success(Successful::yes()))
}

/// POST /v1/user/resend-initial-verification-email
pub async fn resend_initial_verification_email(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AliasRequest>,
) -> ApiResult<Successful> {
    let alias = request.validate()?;
    state.user_manager.resend_initial_verification_email(&alias).await?;
    Ok(ApiResponse::success(Successful::yes()))
}

/// POST /v1/user/send-password-reset-email
pub async fn send_password_reset_email(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AliasRequest>,
) -> ApiResult<Successful> {
    let alias = request.validate()?;
    state.user_manager.send_password_reset_email(&alias).await?;
    Ok(ApiResponse::success(Successful::yes()))
}

/// POST /v1/user/reset-password - alias, emailed code, and the new password
pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> ApiResult<Successful> {
    let mut errors = FieldErrors::new();
    let alias = request.alias.to_alias(&mut errors);
    validate_verification_code(&mut errors, &request.verification_code);
    validate_password(&mut errors, "newPassword", &request.new_password);
    errors.into_result()?;
    let alias = alias.ok_or_else(FieldErrors::new)?;

    state
        .user_manager
        .reset_password(&alias, &request.verification_code, &request.new_password)
        .await?;
    Ok(ApiResponse::success(Successful::yes()))
}
