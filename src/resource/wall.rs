use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::catalog::{Catalog, CatalogResource, NewResource};
use super::dao::ResourceDao;
use super::id::{self, slugify};
use super::ordering;
use super::recursion::ResourceRetriever;
use super::{
    unsupported_child, ChildResources, Crag, OrderableResource, Resource, ResourceError, ResourceType,
    ResourceWithChildren, ResourceWithParent, Route,
};
use crate::validation::FieldErrors;

/// A wall inside a crag. Walls form a left-to-right list through `next_wall_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wall {
    pub wall_id: String,
    pub crag_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_wall_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<Vec<Route>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWall {
    pub crag_id: String,
    pub name: String,
    #[serde(default)]
    pub next_wall_id: Option<String>,
}

impl Resource for Wall {
    const TYPE: ResourceType = ResourceType::Wall;

    fn id(&self) -> &str {
        &self.wall_id
    }

    fn parent_id(&self) -> &str {
        &self.crag_id
    }

    fn clear_child_resources(&mut self) {
        self.routes = None;
    }
}

impl ResourceWithChildren for Wall {
    fn set_child_resources(&mut self, children: ChildResources) -> Result<(), ResourceError> {
        match children {
            ChildResources::Routes(routes) => self.routes = Some(routes),
            other => return Err(unsupported_child::<Self>(&other)),
        }
        Ok(())
    }
}

impl ResourceWithParent<Crag> for Wall {
    fn into_child_resources(resources: Vec<Self>) -> ChildResources {
        ChildResources::Walls(resources)
    }
}

impl OrderableResource for Wall {
    fn next_id(&self) -> Option<&str> {
        self.next_wall_id.as_deref()
    }

    fn set_next_id(&mut self, next_id: Option<String>) {
        self.next_wall_id = next_id;
    }
}

impl CatalogResource for Wall {
    type New = NewWall;
    const ORDERED: bool = true;

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_id(&mut errors, "wallId", &self.wall_id, Self::TYPE);
        id::validate_parent_id(&mut errors, Self::TYPE, &self.crag_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_optional_id(&mut errors, "nextWallId", self.next_wall_id.as_deref(), Self::TYPE);
        errors.check(
            self.next_wall_id.as_deref() != Some(self.wall_id.as_str()),
            "nextWallId",
            "Next wall ID must not refer to the wall itself.",
        );
        errors.into_result()
    }

    fn dao(catalog: &Catalog) -> Arc<dyn ResourceDao<Self>> {
        catalog.walls()
    }

    fn retriever(catalog: &Catalog) -> Arc<dyn ResourceRetriever<Self>> {
        catalog.wall_retriever()
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

impl NewResource for NewWall {
    type Resource = Wall;

    fn parent_id(&self) -> &str {
        &self.crag_id
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        id::validate_parent_id(&mut errors, ResourceType::Wall, &self.crag_id);
        id::validate_name(&mut errors, &self.name);
        id::validate_optional_id(&mut errors, "nextWallId", self.next_wall_id.as_deref(), ResourceType::Wall);
        errors.into_result()
    }

    fn into_resource(self) -> Wall {
        Wall {
            wall_id: id::generate_id(ResourceType::Wall, &id::join(&[&self.crag_id, &slugify(&self.name)])),
            crag_id: self.crag_id,
            name: self.name,
            next_wall_id: self.next_wall_id,
            routes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_id_is_prefixed_by_crag() {
        let wall = NewWall {
            crag_id: "calico-basin-0123456789".to_string(),
            name: "Kraft Boulders".to_string(),
            next_wall_id: None,
        }
        .into_resource();
        assert!(wall.wall_id.starts_with("calico-basin-0123456789-kraft-boulders-"));
        assert!(CatalogResource::validate(&wall).is_ok());
    }

    #[test]
    fn self_reference_is_rejected() {
        let wall = Wall {
            wall_id: "w".to_string(),
            crag_id: "c".to_string(),
            name: "W".to_string(),
            next_wall_id: Some("w".to_string()),
            routes: None,
        };
        let errors = CatalogResource::validate(&wall).unwrap_err();
        assert!(errors.get("nextWallId").is_some());
    }

    #[test]
    fn next_wall_id_uses_camel_case() {
        let wall: Wall = serde_json::from_value(serde_json::json!({
            "wallId": "w1",
            "cragId": "c1",
            "name": "First",
            "nextWallId": "w2"
        }))
        .unwrap();
        assert_eq!(wall.next_id(), Some("w2"));
        assert!(wall.routes.is_none());
    }
}
