//! Recursive resource-tree retrieval.
//!
//! Every resource type has exactly one retriever. A retriever loads the direct
//! children of a parent id through its type's DAO and, while depth remains,
//! asks the retrievers registered for its own child types to fill each loaded
//! resource's child slots. Depth counts resource-type levels: depth 1 returns
//! only the direct children, depth N stops N levels below the requested
//! parent.
//!
//! Two traits split the work. [`ResourceRetriever<R>`] is the typed entry
//! point used by handlers. [`RecursiveResourceRetriever<Parent>`] is the
//! type-erased view a parent's retriever holds for each of its child types;
//! it hands back [`ChildResources`] so that a parent with heterogeneous
//! children (a crag has walls and paths) can keep all of them in one list.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::dao::ResourceDao;
use super::{ChildResources, Resource, ResourceError, ResourceType, ResourceWithChildren, ResourceWithParent};

/// Typed retrieval for resource type `R`
#[async_trait]
pub trait ResourceRetriever<R: Resource>: Send + Sync {
    /// Load the children of `parent_id` and populate their descendants down to `depth` levels.
    /// Fails with `InvalidArgument` when `depth < 1`.
    async fn get_children_recursively(&self, parent_id: &str, depth: u32) -> Result<Vec<R>, ResourceError>;

    /// Load one resource and attach `depth` levels of descendants. Depth 0 returns it bare.
    async fn get_resource_with_children(&self, resource_id: &str, depth: u32) -> Result<R, ResourceError>;

    /// Whether any child of any type is stored under `resource_id`
    async fn has_children(&self, resource_id: &str) -> Result<bool, ResourceError>;
}

/// A child-type retriever as seen from its parent type
#[async_trait]
pub trait RecursiveResourceRetriever<Parent: ResourceWithChildren>: Send + Sync {
    fn child_type(&self) -> ResourceType;

    async fn get_child_resources_recursively(
        &self,
        parent_id: &str,
        depth: u32,
    ) -> Result<ChildResources, ResourceError>;
}

fn check_depth(depth: u32) -> Result<(), ResourceError> {
    if depth < 1 {
        return Err(ResourceError::InvalidArgument(
            "Depth must be greater than or equal to 1.".to_string(),
        ));
    }
    Ok(())
}

async fn load_resource<R: Resource>(dao: &dyn ResourceDao<R>, resource_id: &str) -> Result<R, ResourceError> {
    dao.get_resource(resource_id)
        .await?
        .ok_or_else(|| ResourceError::NotFound {
            resource_type: R::TYPE,
            id: resource_id.to_string(),
        })
}

/// Retriever for a resource type that owns children
pub struct RecursiveResourceWithChildrenRetriever<R: ResourceWithChildren> {
    resource_dao: Arc<dyn ResourceDao<R>>,
    recursive_resource_retrievers: Vec<Arc<dyn RecursiveResourceRetriever<R>>>,
}

impl<R: ResourceWithChildren> RecursiveResourceWithChildrenRetriever<R> {
    pub fn new(resource_dao: Arc<dyn ResourceDao<R>>) -> Self {
        Self {
            resource_dao,
            recursive_resource_retrievers: Vec::new(),
        }
    }

    /// Register the retriever for one of `R`'s child types
    pub fn with_child_retriever(mut self, retriever: Arc<dyn RecursiveResourceRetriever<R>>) -> Self {
        self.recursive_resource_retrievers.push(retriever);
        self
    }

    #[cfg(test)]
    pub fn child_types(&self) -> Vec<ResourceType> {
        self.recursive_resource_retrievers
            .iter()
            .map(|r| r.child_type())
            .collect()
    }

    /// Fill every child slot of `resource` with `depth` levels of descendants.
    /// Empty child sets leave the slot untouched.
    async fn attach_children(&self, resource: &mut R, depth: u32) -> Result<(), ResourceError> {
        let resource_id = resource.id().to_string();
        for retriever in &self.recursive_resource_retrievers {
            let children = retriever
                .get_child_resources_recursively(&resource_id, depth)
                .await?;
            if !children.is_empty() {
                resource.set_child_resources(children)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ResourceWithChildren> ResourceRetriever<R> for RecursiveResourceWithChildrenRetriever<R> {
    async fn get_children_recursively(&self, parent_id: &str, depth: u32) -> Result<Vec<R>, ResourceError> {
        check_depth(depth)?;

        let mut resources = self.resource_dao.get_resources(parent_id).await?;
        debug!(
            "Loaded {} {} children of {} (depth {})",
            resources.len(),
            R::TYPE,
            parent_id,
            depth
        );

        if depth > 1 {
            for resource in resources.iter_mut() {
                self.attach_children(resource, depth - 1).await?;
            }
        }
        Ok(resources)
    }

    async fn get_resource_with_children(&self, resource_id: &str, depth: u32) -> Result<R, ResourceError> {
        let mut resource = load_resource(self.resource_dao.as_ref(), resource_id).await?;
        if depth >= 1 {
            self.attach_children(&mut resource, depth).await?;
        }
        Ok(resource)
    }

    async fn has_children(&self, resource_id: &str) -> Result<bool, ResourceError> {
        for retriever in &self.recursive_resource_retrievers {
            if !retriever
                .get_child_resources_recursively(resource_id, 1)
                .await?
                .is_empty()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl<R, Parent> RecursiveResourceRetriever<Parent> for RecursiveResourceWithChildrenRetriever<R>
where
    R: ResourceWithChildren + ResourceWithParent<Parent>,
    Parent: ResourceWithChildren,
{
    fn child_type(&self) -> ResourceType {
        R::TYPE
    }

    async fn get_child_resources_recursively(
        &self,
        parent_id: &str,
        depth: u32,
    ) -> Result<ChildResources, ResourceError> {
        let resources = ResourceRetriever::get_children_recursively(self, parent_id, depth).await?;
        Ok(<R as ResourceWithParent<Parent>>::into_child_resources(resources))
    }
}

/// Retriever for a leaf resource type; depth beyond 1 has nothing further to load
pub struct RecursiveResourceWithNoChildrenRetriever<R: Resource> {
    resource_dao: Arc<dyn ResourceDao<R>>,
}

impl<R: Resource> RecursiveResourceWithNoChildrenRetriever<R> {
    pub fn new(resource_dao: Arc<dyn ResourceDao<R>>) -> Self {
        Self { resource_dao }
    }
}

#[async_trait]
impl<R: Resource> ResourceRetriever<R> for RecursiveResourceWithNoChildrenRetriever<R> {
    async fn get_children_recursively(&self, parent_id: &str, depth: u32) -> Result<Vec<R>, ResourceError> {
        check_depth(depth)?;
        self.resource_dao.get_resources(parent_id).await
    }

    async fn get_resource_with_children(&self, resource_id: &str, _depth: u32) -> Result<R, ResourceError> {
        load_resource(self.resource_dao.as_ref(), resource_id).await
    }

    async fn has_children(&self, _resource_id: &str) -> Result<bool, ResourceError> {
        Ok(false)
    }
}

#[async_trait]
impl<R, Parent> RecursiveResourceRetriever<Parent> for RecursiveResourceWithNoChildrenRetriever<R>
where
    R: ResourceWithParent<Parent>,
    Parent: ResourceWithChildren,
{
    fn child_type(&self) -> ResourceType {
        R::TYPE
    }

    async fn get_child_resources_recursively(
        &self,
        parent_id: &str,
        depth: u32,
    ) -> Result<ChildResources, ResourceError> {
        let resources = ResourceRetriever::get_children_recursively(self, parent_id, depth).await?;
        Ok(<R as ResourceWithParent<Parent>>::into_child_resources(resources))
    }
}
