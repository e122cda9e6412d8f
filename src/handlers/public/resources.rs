use axum::extract::{Path, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::QueryParams;
use crate::middleware::{ApiResponse, ApiResult};
use crate::resource::CatalogResource;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    pub depth: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChildrenQuery {
    pub depth: Option<i64>,
    #[serde(default)]
    pub ordered: bool,
}

/// Requested depth, bounded by the configured maximum
fn checked_depth(depth: i64, max_depth: u32) -> Result<u32, ApiError> {
    if depth < 0 {
        return Err(ApiError::bad_request("Depth must be greater than or equal to 0."));
    }
    if depth > i64::from(max_depth) {
        return Err(ApiError::bad_request(format!(
            "Depth must be less than or equal to {}.",
            max_depth
        )));
    }
    Ok(depth as u32)
}

/// GET /v1/<type>/:id?depth=N - one resource with its descendants attached N levels deep
pub async fn get_resource<R: CatalogResource>(
    State(state): State<AppState>,
    Path(resource_id): Path<String>,
    QueryParams(query): QueryParams<ResourceQuery>,
) -> ApiResult<R> {
    let depth = checked_depth(query.depth.unwrap_or(0), state.config.resource.max_depth)?;
    let resource = R::retriever(&state.catalog)
        .get_resource_with_children(&resource_id, depth)
        .await?;
    Ok(ApiResponse::success(resource))
}

/// GET /v1/<parent>/:parentId/<type>?depth=N&ordered=bool - direct children of a parent
pub async fn list_resources<R: CatalogResource>(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
    QueryParams(query): QueryParams<ChildrenQuery>,
) -> ApiResult<Vec<R>> {
    let depth = checked_depth(query.depth.unwrap_or(1), state.config.resource.max_depth)?;
    if query.ordered && !R::ORDERED {
        return Err(ApiError::bad_request(format!("{} resources have no order.", R::TYPE)));
    }

    state.catalog.ensure_parent_exists::<R>(&parent_id).await?;
    let resources = R::retriever(&state.catalog)
        .get_children_recursively(&parent_id, depth)
        .await?;

    let resources = if query.ordered {
        R::sort_resources(resources)?
    } else {
        resources
    };
    Ok(ApiResponse::success(resources))
}
