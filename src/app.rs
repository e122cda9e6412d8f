use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{require_administrator, require_user};
use crate::resource::{Crag, Path, Point, Route, Wall};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let config = state.config;

    let mut router = Router::new()
        .merge(public_routes())
        .merge(user_routes(state.clone()))
        .merge(administrator_routes(state.clone()))
        .layer(CookieManagerLayer::new())
        .with_state(state);

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn public_routes() -> Router<AppState> {
    use public::{get_resource, list_resources, user};

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Catalog reads
        .route("/v1/crags/:id", get(get_resource::<Crag>))
        .route("/v1/walls/:id", get(get_resource::<Wall>))
        .route("/v1/routes/:id", get(get_resource::<Route>))
        .route("/v1/points/:id", get(get_resource::<Point>))
        .route("/v1/paths/:id", get(get_resource::<Path>))
        .route("/v1/sub-areas/:id/crags", get(list_resources::<Crag>))
        .route("/v1/crags/:id/walls", get(list_resources::<Wall>))
        .route("/v1/crags/:id/paths", get(list_resources::<Path>))
        .route("/v1/walls/:id/routes", get(list_resources::<Route>))
        .route("/v1/routes/:id/points", get(list_resources::<Point>))
        // Accounts
        .route("/v1/user/register", post(user::register))
        .route("/v1/user/sign-in", post(user::sign_in))
        .route("/v1/user/sign-out", post(user::sign_out))
        .route(
            "/v1/user/resend-initial-verification-email",
            post(user::resend_initial_verification_email),
        )
        .route("/v1/user/send-password-reset-email", post(user::send_password_reset_email))
        .route("/v1/user/reset-password", post(user::reset_password))
}

fn user_routes(state: AppState) -> Router<AppState> {
    use protected::user;

    Router::new()
        .route("/v1/user", get(user::get_user).delete(user::delete_user))
        .route("/v1/user/verify-email", post(user::verify_email))
        .route("/v1/user/send-verification-email", post(user::send_verification_email))
        .route("/v1/user/change-password", post(user::change_password))
        .route_layer(from_fn_with_state(state, require_user))
}

fn administrator_routes(state: AppState) -> Router<AppState> {
    use elevated::{batch_create_points, create_resource, delete_resource, update_resource};

    Router::new()
        .route("/v1/crags", post(create_resource::<Crag>).put(update_resource::<Crag>))
        .route("/v1/walls", post(create_resource::<Wall>).put(update_resource::<Wall>))
        .route("/v1/routes", post(create_resource::<Route>).put(update_resource::<Route>))
        .route("/v1/points", post(create_resource::<Point>).put(update_resource::<Point>))
        .route("/v1/paths", post(create_resource::<Path>).put(update_resource::<Path>))
        .route("/v1/crags/:id", delete(delete_resource::<Crag>))
        .route("/v1/walls/:id", delete(delete_resource::<Wall>))
        .route("/v1/routes/:id", delete(delete_resource::<Route>))
        .route("/v1/points/:id", delete(delete_resource::<Point>))
        .route("/v1/paths/:id", delete(delete_resource::<Path>))
        .route("/v1/routes/:id/points/batch", post(batch_create_points))
        .route_layer(from_fn_with_state(state, require_administrator))
}

/// Cookie sessions need credentials, so origins are listed rather than wildcarded
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use crate::resource::Catalog;
    use crate::user::token::TokenKind;
    use crate::user::{Alias, InMemoryUserStore, LocalUserManager, LoggingEmailSender, TokenIssuer, UserManager, UserStore};
    use chrono::Duration;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn memory_app() -> Router {
        let config: &'static AppConfig = Box::leak(Box::new(AppConfig::development()));
        app(AppState::build(config).await.unwrap())
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = send(
            memory_app().await,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn writes_without_a_session_are_unauthorized() {
        let request = Request::post("/v1/crags")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"subAreaId":"area","name":"Crag"}"#))
            .unwrap();
        let (status, body) = send(memory_app().await, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn reads_share_paths_with_guarded_deletes() {
        let router = memory_app().await;

        let (status, _) = send(
            router.clone(),
            Request::get("/v1/walls/missing-wall").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            router,
            Request::delete("/v1/walls/missing-wall").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshed_into_a_new_cookie() {
        const SECRET: &str = "refresh-secret";
        const PASSWORD: &str = "hailing-frequencies";

        let store = Arc::new(InMemoryUserStore::new());
        let tokens = TokenIssuer::new(SECRET, Duration::minutes(5), Duration::days(1)).unwrap();
        let manager =
            LocalUserManager::new(store.clone(), tokens, Arc::new(LoggingEmailSender)).with_password_cost(4);
        manager.register("uhura", "uhura@starfleet.org", PASSWORD).await.unwrap();
        let session = manager.sign_in(&Alias::username("uhura"), PASSWORD).await.unwrap();

        // Same key, already past its expiry
        let user = store.find_by_username("uhura").await.unwrap().unwrap();
        let expired = TokenIssuer::new(SECRET, Duration::minutes(-5), Duration::days(1))
            .unwrap()
            .issue(&user, TokenKind::Access)
            .unwrap();

        let config: &'static AppConfig = Box::leak(Box::new(AppConfig::development()));
        let state = AppState::new(config, Arc::new(Catalog::in_memory()), Arc::new(manager), None);
        let request = Request::get("/v1/user")
            .header(
                header::COOKIE,
                format!("accessToken={}; refreshToken={}", expired, session.refresh_token),
            )
            .body(Body::empty())
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let access_cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter(|c| c.starts_with("accessToken="))
            .map(str::to_string)
            .collect();
        assert_eq!(access_cookies.len(), 1);
        assert!(!access_cookies[0].starts_with(&format!("accessToken={};", expired)));
        assert!(access_cookies[0].contains("HttpOnly"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["username"], "uhura");
    }
}
