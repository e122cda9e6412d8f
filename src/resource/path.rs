use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog::{Catalog, CatalogResource, NewResource};
use super::dao::ResourceDao;
use super::id::{self, slugify};
use super::recursion::ResourceRetriever;
use super::{ChildResources, Crag, Resource, ResourceType, ResourceWithParent};
use crate::validation::FieldErrors;

/// An approach path leading to a crag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    pub path_id: String,
    pub crag_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPath {
    pub crag_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Resource for Path {
    const TYPE: ResourceType = ResourceType::Path;

    fn id(&self) -> &str {
        &self.path_id
    }

    fn parent_id(&self) -> &str {
        &self.crag_id
    }
}

impl ResourceWithParent<Crag> for Path {
    fn into_child_resources(resources: Vec<Self>) -> ChildResources {
        ChildResources::Paths(resources)
    }
}

impl CatalogResource for Path {
    type New = NewPath;

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_id(&mut errors, "pathId", &self.path_id, Self::TYPE);
        id::validate_parent_id(&mut errors, Self::TYPE, &self.crag_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_description(&mut errors, &self.description);
        errors.into_result()
    }

    fn dao(catalog: &Catalog) -> Arc<dyn ResourceDao<Self>> {
        catalog.paths()
    }

    fn retriever(catalog: &Catalog) -> Arc<dyn ResourceRetriever<Self>> {
        catalog.path_retriever()
    }
}

impl NewResource for NewPath {
    type Resource = Path;

    fn parent_id(&self) -> &str {
        &self.crag_id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_parent_id(&mut errors, ResourceType::Path, &self.crag_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_description(&mut errors, &self.description);
        errors.into_result()
    }

    fn into_resource(self) -> Path {
        Path {
            path_id: id::generate_id(
                ResourceType::Path,
                &id::join(&[&self.crag_id, "path", &slugify(&self.name)]),
            ),
            crag_id: self.crag_id,
            name: self.name,
            description: self.description,
        }
    }
}
