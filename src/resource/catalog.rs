use serde::de::DeserializeOwned;
use sqlx::PgPool;
use std::sync::Arc;

use super::dao::{PgResourceDao, ResourceDao};
use super::memory::InMemoryResourceDao;
use super::recursion::{
    RecursiveResourceWithChildrenRetriever, RecursiveResourceWithNoChildrenRetriever, ResourceRetriever,
};
use super::{Crag, Path, Point, Resource, ResourceError, ResourceType, Route, Wall};
use crate::validation::FieldErrors;

/// A resource type served by the generic catalog handlers
pub trait CatalogResource: Resource {
    /// Request body that creates one of these
    type New: NewResource<Resource = Self>;

    /// Siblings carry a `next` id and can be listed in order
    const ORDERED: bool = false;

    fn validate(&self) -> Result<(), FieldErrors>;

    fn dao(catalog: &Catalog) -> Arc<dyn ResourceDao<Self>>;

    fn retriever(catalog: &Catalog) -> Arc<dyn ResourceRetriever<Self>>;

    fn sort_resources(resources: Vec<Self>) -> Result<Vec<Self>, ResourceError> {
        Ok(resources)
    }

    /// Sibling whose `next` id changes when `resource` is added, for ordered types
    fn link_into(_siblings: Vec<Self>, _resource: &Self) -> Result<Option<Self>, ResourceError> {
        Ok(None)
    }

    /// Sibling whose `next` id changes when `resource` is removed, for ordered types
    fn unlink_from(_siblings: Vec<Self>, _resource: &Self) -> Option<Self> {
        None
    }
}

/// Creation request for a catalog resource; the id is generated on conversion
pub trait NewResource: DeserializeOwned + Send + 'static {
    type Resource: CatalogResource;

    fn parent_id(&self) -> &str;

    fn validate(&self) -> Result<(), FieldErrors>;

    fn into_resource(self) -> Self::Resource;
}

/// DAOs backing the catalog, one per resource type
pub struct CatalogDaos {
    pub crags: Arc<dyn ResourceDao<Crag>>,
    pub walls: Arc<dyn ResourceDao<Wall>>,
    pub routes: Arc<dyn ResourceDao<Route>>,
    pub points: Arc<dyn ResourceDao<Point>>,
    pub paths: Arc<dyn ResourceDao<Path>>,
}

impl CatalogDaos {
    pub fn in_memory() -> Self {
        Self {
            crags: Arc::new(InMemoryResourceDao::<Crag>::new()),
            walls: Arc::new(InMemoryResourceDao::<Wall>::new()),
            routes: Arc::new(InMemoryResourceDao::<Route>::new()),
            points: Arc::new(InMemoryResourceDao::<Point>::new()),
            paths: Arc::new(InMemoryResourceDao::<Path>::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            crags: Arc::new(PgResourceDao::<Crag>::new(pool.clone())),
            walls: Arc::new(PgResourceDao::<Wall>::new(pool.clone())),
            routes: Arc::new(PgResourceDao::<Route>::new(pool.clone())),
            points: Arc::new(PgResourceDao::<Point>::new(pool.clone())),
            paths: Arc::new(PgResourceDao::<Path>::new(pool)),
        }
    }
}

/// The wired-up resource tree: DAOs plus one retriever per type
pub struct Catalog {
    daos: CatalogDaos,
    crag_retriever: Arc<RecursiveResourceWithChildrenRetriever<Crag>>,
    wall_retriever: Arc<RecursiveResourceWithChildrenRetriever<Wall>>,
    route_retriever: Arc<RecursiveResourceWithChildrenRetriever<Route>>,
    point_retriever: Arc<RecursiveResourceWithNoChildrenRetriever<Point>>,
    path_retriever: Arc<RecursiveResourceWithNoChildrenRetriever<Path>>,
}

impl Catalog {
    pub fn new(daos: CatalogDaos) -> Self {
        let point_retriever = Arc::new(RecursiveResourceWithNoChildrenRetriever::new(daos.points.clone()));
        let path_retriever = Arc::new(RecursiveResourceWithNoChildrenRetriever::new(daos.paths.clone()));
        let route_retriever = Arc::new(
            RecursiveResourceWithChildrenRetriever::new(daos.routes.clone())
                .with_child_retriever(point_retriever.clone()),
        );
        let wall_retriever = Arc::new(
            RecursiveResourceWithChildrenRetriever::new(daos.walls.clone())
                .with_child_retriever(route_retriever.clone()),
        );
        let crag_retriever = Arc::new(
            RecursiveResourceWithChildrenRetriever::new(daos.crags.clone())
                .with_child_retriever(wall_retriever.clone())
                .with_child_retriever(path_retriever.clone()),
        );

        Self {
            daos,
            crag_retriever,
            wall_retriever,
            route_retriever,
            point_retriever,
            path_retriever,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(CatalogDaos::in_memory())
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::new(CatalogDaos::postgres(pool))
    }

    pub fn crags(&self) -> Arc<dyn ResourceDao<Crag>> {
        self.daos.crags.clone()
    }

    pub fn walls(&self) -> Arc<dyn ResourceDao<Wall>> {
        self.daos.walls.clone()
    }

    pub fn routes(&self) -> Arc<dyn ResourceDao<Route>> {
        self.daos.routes.clone()
    }

    pub fn points(&self) -> Arc<dyn ResourceDao<Point>> {
        self.daos.points.clone()
    }

    pub fn paths(&self) -> Arc<dyn ResourceDao<Path>> {
        self.daos.paths.clone()
    }

    pub fn crag_retriever(&self) -> Arc<dyn ResourceRetriever<Crag>> {
        self.crag_retriever.clone()
    }

    pub fn wall_retriever(&self) -> Arc<dyn ResourceRetriever<Wall>> {
        self.wall_retriever.clone()
    }

    pub fn route_retriever(&self) -> Arc<dyn ResourceRetriever<Route>> {
        self.route_retriever.clone()
    }

    pub fn point_retriever(&self) -> Arc<dyn ResourceRetriever<Point>> {
        self.point_retriever.clone()
    }

    pub fn path_retriever(&self) -> Arc<dyn ResourceRetriever<Path>> {
        self.path_retriever.clone()
    }

    /// Whether a stored resource of `resource_type` has this id
    pub async fn resource_exists(&self, resource_type: ResourceType, resource_id: &str) -> Result<bool, ResourceError> {
        match resource_type {
            ResourceType::Crag => self.daos.crags.resource_exists(resource_id).await,
            ResourceType::Wall => self.daos.walls.resource_exists(resource_id).await,
            ResourceType::Route => self.daos.routes.resource_exists(resource_id).await,
            ResourceType::Point => self.daos.points.resource_exists(resource_id).await,
            ResourceType::Path => self.daos.paths.resource_exists(resource_id).await,
        }
    }

    /// Check that the parent an `R` would hang off is stored. Crags always pass: sub-areas live elsewhere.
    pub async fn ensure_parent_exists<R: Resource>(&self, parent_id: &str) -> Result<(), ResourceError> {
        if let Some(parent_type) = R::TYPE.parent_type() {
            if !self.resource_exists(parent_type, parent_id).await? {
                return Err(ResourceError::ParentNotFound {
                    resource_type: parent_type,
                    id: parent_id.to_string(),
                });
            }
        }
        Ok(())
    }
}
