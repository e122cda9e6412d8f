use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "ClimbAssist API",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": format!("{:?}", state.config.environment),
            "storage": format!("{:?}", state.config.storage.backend),
            "endpoints": {
                "catalog": "/v1/{crags,walls,routes,points,paths}/:id?depth=N",
                "children": "/v1/{sub-areas,crags,walls,routes}/:parentId/{crags,walls,paths,routes,points}",
                "user": "/v1/user/*",
                "health": "/health"
            }
        }
    }))
}

/// GET /health - liveness plus database reachability when PostgreSQL backs the service
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.database {
        None => "not used",
        Some(database) => match database.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "success": false, "data": { "status": "degraded", "database": "unreachable" } })),
                );
            }
        },
    };

    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "status": "ok", "database": database } })),
    )
}
