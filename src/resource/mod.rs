//! Catalog resources and the machinery shared by every resource type.
//!
//! The catalog is a tree: sub-areas hold crags, crags hold walls and approach
//! paths, walls hold routes, and routes hold the points that trace them. Each
//! resource knows its own id and its parent's id; resources that own children
//! expose one optional slot per child type, filled only by the recursive
//! retriever.

pub mod catalog;
pub mod crag;
pub mod dao;
pub mod id;
pub mod memory;
pub mod ordering;
pub mod path;
pub mod point;
pub mod recursion;
pub mod route;
pub mod wall;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::database::DatabaseError;

pub use catalog::{Catalog, CatalogResource, NewResource};
pub use crag::{Crag, Location, NewCrag};
pub use dao::{PgResourceDao, ResourceDao};
pub use memory::InMemoryResourceDao;
pub use path::{NewPath, Path};
pub use point::{NewPoint, Point};
pub use recursion::{
    RecursiveResourceRetriever, RecursiveResourceWithChildrenRetriever,
    RecursiveResourceWithNoChildrenRetriever, ResourceRetriever,
};
pub use route::{NewRoute, Route};
pub use wall::{NewWall, Wall};

/// Every kind of resource held in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Crag,
    Wall,
    Route,
    Point,
    Path,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Crag,
        ResourceType::Wall,
        ResourceType::Route,
        ResourceType::Point,
        ResourceType::Path,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceType::Crag => "crag",
            ResourceType::Wall => "wall",
            ResourceType::Route => "route",
            ResourceType::Point => "point",
            ResourceType::Path => "path",
        }
    }

    /// Storage table; rows are keyed by id and indexed by parent id
    pub fn table_name(&self) -> &'static str {
        match self {
            ResourceType::Crag => "crags",
            ResourceType::Wall => "walls",
            ResourceType::Route => "routes",
            ResourceType::Point => "points",
            ResourceType::Path => "paths",
        }
    }

    /// JSON field carrying this type's id
    pub fn id_field(&self) -> &'static str {
        match self {
            ResourceType::Crag => "cragId",
            ResourceType::Wall => "wallId",
            ResourceType::Route => "routeId",
            ResourceType::Point => "pointId",
            ResourceType::Path => "pathId",
        }
    }

    /// JSON field carrying the parent's id
    pub fn parent_field(&self) -> &'static str {
        match self {
            ResourceType::Crag => "subAreaId",
            ResourceType::Wall | ResourceType::Path => "cragId",
            ResourceType::Route => "wallId",
            ResourceType::Point => "routeId",
        }
    }

    /// Stored parent type. Crags hang off sub-areas, which this service does not store.
    pub fn parent_type(&self) -> Option<ResourceType> {
        match self {
            ResourceType::Crag => None,
            ResourceType::Wall | ResourceType::Path => Some(ResourceType::Crag),
            ResourceType::Route => Some(ResourceType::Wall),
            ResourceType::Point => Some(ResourceType::Route),
        }
    }

    pub fn max_id_length(&self) -> usize {
        match self {
            ResourceType::Crag => 72,
            ResourceType::Wall => 111,
            ResourceType::Route => 110,
            // route id (max 110) + "-point" (6) + "-" (1) + slug (10)
            ResourceType::Point => 127,
            ResourceType::Path => 82,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{resource_type} {id} was not found")]
    NotFound { resource_type: ResourceType, id: String },

    #[error("parent {resource_type} {id} was not found")]
    ParentNotFound { resource_type: ResourceType, id: String },

    #[error("{resource_type} {id} still has children and cannot be deleted")]
    NotEmpty { resource_type: ResourceType, id: String },

    #[error("{parent} resources do not hold {child} children")]
    UnsupportedChildType { parent: ResourceType, child: ResourceType },

    #[error("Invalid ordering: {0}")]
    InvalidOrdering(String),

    #[error("Failed to (de)serialize resource: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ResourceError {
    fn from(err: sqlx::Error) -> Self {
        ResourceError::Database(DatabaseError::Sqlx(err))
    }
}

/// One child collection, tagged with its type so a parent can route it to the right slot
#[derive(Debug, Clone, PartialEq)]
pub enum ChildResources {
    Walls(Vec<Wall>),
    Routes(Vec<Route>),
    Points(Vec<Point>),
    Paths(Vec<Path>),
}

impl ChildResources {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ChildResources::Walls(_) => ResourceType::Wall,
            ChildResources::Routes(_) => ResourceType::Route,
            ChildResources::Points(_) => ResourceType::Point,
            ChildResources::Paths(_) => ResourceType::Path,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChildResources::Walls(v) => v.len(),
            ChildResources::Routes(v) => v.len(),
            ChildResources::Points(v) => v.len(),
            ChildResources::Paths(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A stored catalog entry
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: ResourceType;

    fn id(&self) -> &str;

    fn parent_id(&self) -> &str;

    /// Drop any attached children. Stored copies never carry them.
    fn clear_child_resources(&mut self) {}
}

/// A resource with one slot per child type
pub trait ResourceWithChildren: Resource {
    /// Place `children` in the slot for their type
    fn set_child_resources(&mut self, children: ChildResources) -> Result<(), ResourceError>;
}

/// A resource that can be attached to a `Parent`
pub trait ResourceWithParent<Parent: ResourceWithChildren>: Resource {
    fn into_child_resources(resources: Vec<Self>) -> ChildResources;
}

/// A resource kept in a singly linked list among its siblings
pub trait OrderableResource: Resource {
    fn next_id(&self) -> Option<&str>;

    fn set_next_id(&mut self, next_id: Option<String>);
}

fn unsupported_child<R: Resource>(children: &ChildResources) -> ResourceError {
    ResourceError::UnsupportedChildType {
        parent: R::TYPE,
        child: children.resource_type(),
    }
}
