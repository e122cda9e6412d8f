use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog::{Catalog, CatalogResource, NewResource};
use super::dao::ResourceDao;
use super::id::{self, slugify};
use super::recursion::ResourceRetriever;
use super::{unsupported_child, ChildResources, Path, Resource, ResourceError, ResourceType, ResourceWithChildren, Wall};
use crate::validation::FieldErrors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crag {
    pub crag_id: String,
    pub sub_area_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walls: Option<Vec<Wall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<Path>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

impl Location {
    fn validate(&self, errors: &mut FieldErrors) {
        errors
            .check(
                (-90.0..=90.0).contains(&self.latitude),
                "location.latitude",
                "Latitude must be between -90 and 90.",
            )
            .check(
                (-180.0..=180.0).contains(&self.longitude),
                "location.longitude",
                "Longitude must be between -180 and 180.",
            )
            .check(
                self.zoom.map_or(true, |z| (0.0..=22.0).contains(&z)),
                "location.zoom",
                "Zoom must be between 0 and 22.",
            );
    }
}

/// Body of `POST /v1/crags`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCrag {
    pub sub_area_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Resource for Crag {
    const TYPE: ResourceType = ResourceType::Crag;

    fn id(&self) -> &str {
        &self.crag_id
    }

    fn parent_id(&self) -> &str {
        &self.sub_area_id
    }

    fn clear_child_resources(&mut self) {
        self.walls = None;
        self.paths = None;
    }
}

impl ResourceWithChildren for Crag {
    fn set_child_resources(&mut self, children: ChildResources) -> Result<(), ResourceError> {
        match children {
            ChildResources::Walls(walls) => self.walls = Some(walls),
            ChildResources::Paths(paths) => self.paths = Some(paths),
            other => return Err(unsupported_child::<Self>(&other)),
        }
        Ok(())
    }
}

impl CatalogResource for Crag {
    type New = NewCrag;

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_id(&mut errors, "cragId", &self.crag_id, Self::TYPE);
        id::validate_parent_id(&mut errors, Self::TYPE, &self.sub_area_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_description(&mut errors, &self.description);
        if let Some(location) = &self.location {
            location.validate(&mut errors);
        }
        errors.into_result()
    }

    fn dao(catalog: &Catalog) -> Arc<dyn ResourceDao<Self>> {
        catalog.crags()
    }

    fn retriever(catalog: &Catalog) -> Arc<dyn ResourceRetriever<Self>> {
        catalog.crag_retriever()
    }
}

impl NewResource for NewCrag {
    type Resource = Crag;

    fn parent_id(&self) -> &str {
        &self.sub_area_id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_parent_id(&mut errors, ResourceType::Crag, &self.sub_area_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_description(&mut errors, &self.description);
        if let Some(location) = &self.location {
            location.validate(&mut errors);
        }
        errors.into_result()
    }

    fn into_resource(self) -> Crag {
        Crag {
            crag_id: id::generate_id(ResourceType::Crag, &slugify(&self.name)),
            sub_area_id: self.sub_area_id,
            name: self.name,
            description: self.description,
            location: self.location,
            walls: None,
            paths: None,
        }
    }
}
