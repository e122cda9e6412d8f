use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use super::session::{read_session, write_session};
use crate::error::ApiError;
use crate::state::AppState;
use crate::user::AuthorizationHandler;

/// Routes for any signed-in user
pub async fn require_user(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let handler = state.user_authorization.clone();
    authorize(handler.as_ref(), &state, cookies, request, next).await
}

/// Routes for administrators only
pub async fn require_administrator(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let handler = state.administrator_authorization.clone();
    authorize(handler.as_ref(), &state, cookies, request, next).await
}

/// Check the cookie session, persist a refreshed access token, and hand the
/// session to the handler through request extensions
async fn authorize(
    handler: &dyn AuthorizationHandler,
    state: &AppState,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = read_session(&cookies).ok_or_else(|| ApiError::unauthorized("User is not signed in."))?;
    let authorized = handler.check_authorization(session.clone()).await?;

    if authorized.access_token != session.access_token {
        write_session(&cookies, &authorized, state.config.security.secure_cookies);
    }

    request.extensions_mut().insert(authorized);
    Ok(next.run(request).await)
}
