use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog::{Catalog, CatalogResource, NewResource};
use super::dao::ResourceDao;
use super::id::{self, slugify};
use super::recursion::ResourceRetriever;
use super::{
    unsupported_child, ChildResources, Point, Resource, ResourceError, ResourceType, ResourceWithChildren,
    ResourceWithParent, Wall,
};
use crate::validation::{length_between, FieldErrors};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub route_id: String,
    pub wall_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    pub wall_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

fn validate_details(errors: &mut FieldErrors, grade: Option<&str>, style: Option<&str>) {
    errors
        .check(
            grade.map_or(true, |g| length_between(g, 1, 16)),
            "grade",
            "Grade must be between 1 and 16 characters.",
        )
        .check(
            style.map_or(true, |s| length_between(s, 1, 32)),
            "style",
            "Style must be between 1 and 32 characters.",
        );
}

impl Resource for Route {
    const TYPE: ResourceType = ResourceType::Route;

    fn id(&self) -> &str {
        &self.route_id
    }

    fn parent_id(&self) -> &str {
        &self.wall_id
    }

    fn clear_child_resources(&mut self) {
        self.points = None;
    }
}

impl ResourceWithChildren for Route {
    fn set_child_resources(&mut self, children: ChildResources) -> Result<(), ResourceError> {
        match children {
            ChildResources::Points(points) => self.points = Some(points),
            other => return Err(unsupported_child::<Self>(&other)),
        }
        Ok(())
    }
}

impl ResourceWithParent<Wall> for Route {
    fn into_child_resources(resources: Vec<Self>) -> ChildResources {
        ChildResources::Routes(resources)
    }
}

impl CatalogResource for Route {
    type New = NewRoute;

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_id(&mut errors, "routeId", &self.route_id, Self::TYPE);
        id::validate_parent_id(&mut errors, Self::TYPE, &self.wall_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_description(&mut errors, &self.description);
        validate_details(&mut errors, self.grade.as_deref(), self.style.as_deref());
        errors.into_result()
    }

    fn dao(catalog: &Catalog) -> Arc<dyn ResourceDao<Self>> {
        catalog.routes()
    }

    fn retriever(catalog: &Catalog) -> Arc<dyn ResourceRetriever<Self>> {
        catalog.route_retriever()
    }
}

impl NewResource for NewRoute {
    type Resource = Route;

    fn parent_id(&self) -> &str {
        &self.wall_id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_parent_id(&mut errors, ResourceType::Route, &self.wall_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_description(&mut errors, &self.description);
        validate_details(&mut errors, self.grade.as_deref(), self.style.as_deref());
        errors.into_result()
    }

    fn into_resource(self) -> Route {
        Route {
            route_id: id::generate_id(ResourceType::Route, &id::join(&[&self.wall_id, &slugify(&self.name)])),
            wall_id: self.wall_id,
            name: self.name,
            description: self.description,
            grade: self.grade,
            style: self.style,
            points: None,
        }
    }
}
