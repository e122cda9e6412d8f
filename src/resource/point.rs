use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog::{Catalog, CatalogResource, NewResource};
use super::dao::ResourceDao;
use super::id;
use super::ordering;
use super::recursion::ResourceRetriever;
use super::{ChildResources, OrderableResource, Resource, ResourceError, ResourceType, ResourceWithParent, Route};
use crate::validation::FieldErrors;

/// One vertex of a route line, in the wall model's coordinate space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub point_id: String,
    pub route_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_point_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoint {
    pub route_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub next_point_id: Option<String>,
}

fn validate_coordinates(errors: &mut FieldErrors, x: f64, y: f64, z: f64) {
    errors
        .check(x.is_finite(), "x", "X must be a finite number.")
        .check(y.is_finite(), "y", "Y must be a finite number.")
        .check(z.is_finite(), "z", "Z must be a finite number.");
}

impl Resource for Point {
    const TYPE: ResourceType = ResourceType::Point;

    fn id(&self) -> &str {
        &self.point_id
    }

    fn parent_id(&self) -> &str {
        &self.route_id
    }
}

impl ResourceWithParent<Route> for Point {
    fn into_child_resources(resources: Vec<Self>) -> ChildResources {
        ChildResources::Points(resources)
    }
}

impl OrderableResource for Point {
    fn next_id(&self) -> Option<&str> {
        self.next_point_id.as_deref()
    }

    fn set_next_id(&mut self, next_id: Option<String>) {
        self.next_point_id = next_id;
    }
}

impl CatalogResource for Point {
    type New = NewPoint;
    const ORDERED: bool = true;

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_id(&mut errors, "pointId", &self.point_id, Self::TYPE);
        id::validate_parent_id(&mut errors, Self::TYPE, &self.route_id);
        id::validate_optional_id(&mut errors, "nextPointId", self.next_point_id.as_deref(), Self::TYPE);
        validate_coordinates(&mut errors, self.x, self.y, self.z);
        errors.check(
            self.next_point_id.as_deref() != Some(self.point_id.as_str()),
            "nextPointId",
            "Next point ID must not refer to the point itself.",
        );
        errors.into_result()
    }

    fn dao(catalog: &Catalog) -> Arc<dyn ResourceDao<Self>> {
        catalog.points()
    }

    fn retriever(catalog: &Catalog) -> Arc<dyn ResourceRetriever<Self>> {
        catalog.point_retriever()
    }

    fn sort_resources(resources: Vec<Self>) -> Result<Vec<Self>, ResourceError> {
        ordering::sort_resources(resources)
    }

    fn link_into(siblings: Vec<Self>, resource: &Self) -> Result<Option<Self>, ResourceError> {
        ordering::link_into(siblings, resource)
    }

    fn unlink_from(siblings: Vec<Self>, resource: &Self) -> Option<Self> {
        ordering::unlink_from(siblings, resource)
    }
}

impl NewResource for NewPoint {
    type Resource = Point;

    fn parent_id(&self) -> &str {
        &self.route_id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_parent_id(&mut errors, ResourceType::Point, &self.route_id);
        id::validate_optional_id(&mut errors, "nextPointId", self.next_point_id.as_deref(), ResourceType::Point);
        validate_coordinates(&mut errors, self.x, self.y, self.z);
        errors.into_result()
    }

    fn into_resource(self) -> Point {
        Point {
            point_id: id::generate_id(ResourceType::Point, &id::join(&[&self.route_id, "point"])),
            route_id: self.route_id,
            x: self.x,
            y: self.y,
            z: self.z,
            next_point_id: self.next_point_id,
        }
    }
}
