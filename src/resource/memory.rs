use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::dao::ResourceDao;
use super::{Resource, ResourceError};

/// Process-local DAO used by the `memory` storage backend and by tests
pub struct InMemoryResourceDao<R> {
    resources: RwLock<HashMap<String, R>>,
}

impl<R: Resource> InMemoryResourceDao<R> {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn with_resources(resources: impl IntoIterator<Item = R>) -> Self {
        let resources = resources
            .into_iter()
            .map(|mut r| {
                r.clear_child_resources();
                (r.id().to_string(), r)
            })
            .collect();
        Self {
            resources: RwLock::new(resources),
        }
    }

    #[cfg(test)]
    pub async fn count(&self) -> usize {
        self.resources.read().await.len()
    }
}

impl<R: Resource> Default for InMemoryResourceDao<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Resource> ResourceDao<R> for InMemoryResourceDao<R> {
    async fn get_resource(&self, resource_id: &str) -> Result<Option<R>, ResourceError> {
        Ok(self.resources.read().await.get(resource_id).cloned())
    }

    async fn get_resources(&self, parent_id: &str) -> Result<Vec<R>, ResourceError> {
        let resources = self.resources.read().await;
        let mut children: Vec<R> = resources
            .values()
            .filter(|r| r.parent_id() == parent_id)
            .cloned()
            .collect();
        // Match the PostgreSQL DAO's ORDER BY id
        children.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(children)
    }

    async fn save_resource(&self, resource: &R) -> Result<(), ResourceError> {
        let mut stored = resource.clone();
        stored.clear_child_resources();
        self.resources
            .write()
            .await
            .insert(stored.id().to_string(), stored);
        Ok(())
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<(), ResourceError> {
        self.resources.write().await.remove(resource_id);
        Ok(())
    }
}
