use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, Successful};
use crate::resource::ordering::{link_in_order, relink, BatchCreateResourcesResult};
use crate::resource::{CatalogResource, NewPoint, NewResource, Point, ResourceError};
use crate::state::AppState;
use crate::validation::FieldErrors;

/// POST /v1/<type> - create a resource under an existing parent; responds with its generated id.
/// Ordered resources go before their `next` sibling, or last when they name none.
pub async fn create_resource<R: CatalogResource>(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<R::New>,
) -> ApiResult<Value> {
    request.validate()?;
    state.catalog.ensure_parent_exists::<R>(request.parent_id()).await?;

    let resource: R = request.into_resource();
    let dao = R::dao(&state.catalog);
    let predecessor = if R::ORDERED {
        R::link_into(dao.get_resources(resource.parent_id()).await?, &resource)?
    } else {
        None
    };

    dao.save_resource(&resource).await?;
    if let Some(predecessor) = predecessor {
        dao.save_resource(&predecessor).await?;
    }
    info!("Created {} {}", R::TYPE, resource.id());

    let mut body = Map::new();
    body.insert(R::TYPE.id_field().to_string(), Value::String(resource.id().to_string()));
    Ok(ApiResponse::created(Value::Object(body)))
}

/// PUT /v1/<type> - replace a stored resource
pub async fn update_resource<R: CatalogResource>(
    State(state): State<AppState>,
    JsonBody(resource): JsonBody<R>,
) -> ApiResult<Successful> {
    resource.validate()?;

    let dao = R::dao(&state.catalog);
    if !dao.resource_exists(resource.id()).await? {
        return Err(ResourceError::NotFound {
            resource_type: R::TYPE,
            id: resource.id().to_string(),
        }
        .into());
    }
    state.catalog.ensure_parent_exists::<R>(resource.parent_id()).await?;

    dao.save_resource(&resource).await?;
    info!("Updated {} {}", R::TYPE, resource.id());
    Ok(ApiResponse::success(Successful::yes()))
}

/// DELETE /v1/<type>/:id - only leaves of the tree can go. An ordered resource's
/// predecessor is pointed past it first.
pub async fn delete_resource<R: CatalogResource>(
    State(state): State<AppState>,
    Path(resource_id): Path<String>,
) -> ApiResult<Successful> {
    let dao = R::dao(&state.catalog);
    let Some(resource) = dao.get_resource(&resource_id).await? else {
        return Err(ResourceError::NotFound {
            resource_type: R::TYPE,
            id: resource_id,
        }
        .into());
    };
    if R::retriever(&state.catalog).has_children(&resource_id).await? {
        return Err(ResourceError::NotEmpty {
            resource_type: R::TYPE,
            id: resource_id,
        }
        .into());
    }

    if R::ORDERED {
        let siblings = dao.get_resources(resource.parent_id()).await?;
        if let Some(predecessor) = R::unlink_from(siblings, &resource) {
            dao.save_resource(&predecessor).await?;
        }
    }

    dao.delete_resource(&resource_id).await?;
    info!("Deleted {} {}", R::TYPE, resource_id);
    Ok(ApiResponse::success(Successful::yes()))
}

#[derive(Debug, Deserialize)]
pub struct BatchNewPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchNewPoints {
    pub new_points: Vec<BatchNewPoint>,
}

/// POST /v1/routes/:routeId/points/batch - append points to a route's line, in request order
pub async fn batch_create_points(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
    JsonBody(request): JsonBody<BatchNewPoints>,
) -> ApiResult<BatchCreateResourcesResult> {
    let mut errors = FieldErrors::new();
    errors.check(!request.new_points.is_empty(), "newPoints", "New points must not be empty.");
    let new_points: Vec<NewPoint> = request
        .new_points
        .into_iter()
        .map(|p| NewPoint {
            route_id: route_id.clone(),
            x: p.x,
            y: p.y,
            z: p.z,
            next_point_id: None,
        })
        .collect();
    for new_point in &new_points {
        if let Err(point_errors) = new_point.validate() {
            errors.merge(point_errors);
        }
    }
    errors.into_result()?;

    state.catalog.ensure_parent_exists::<Point>(&route_id).await?;
    let dao = Point::dao(&state.catalog);

    let mut points: Vec<Point> = new_points.into_iter().map(NewPoint::into_resource).collect();
    link_in_order(&mut points);

    let existing = dao.get_resources(&route_id).await?;
    for point in &points {
        dao.save_resource(point).await?;
    }
    // Hook the existing tail onto the first new point
    if let Some(tail) = relink(existing, None, Some(&points[0].point_id)) {
        dao.save_resource(&tail).await?;
    }
    info!("Created {} points on route {}", points.len(), route_id);

    Ok(ApiResponse::created(BatchCreateResourcesResult {
        ids: points.into_iter().map(|p| p.point_id).collect(),
    }))
}
