use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::marker::PhantomData;
use tracing::debug;

use super::{Resource, ResourceError};
use crate::database::manager::DatabaseManager;

/// Storage for one resource type, keyed by id and indexed by parent id
#[async_trait]
pub trait ResourceDao<R: Resource>: Send + Sync {
    async fn get_resource(&self, resource_id: &str) -> Result<Option<R>, ResourceError>;

    /// All direct children of `parent_id` of this DAO's type
    async fn get_resources(&self, parent_id: &str) -> Result<Vec<R>, ResourceError>;

    /// Insert or replace. Attached children are never persisted.
    async fn save_resource(&self, resource: &R) -> Result<(), ResourceError>;

    async fn delete_resource(&self, resource_id: &str) -> Result<(), ResourceError>;

    async fn resource_exists(&self, resource_id: &str) -> Result<bool, ResourceError> {
        Ok(self.get_resource(resource_id).await?.is_some())
    }
}

/// PostgreSQL-backed DAO. Each type has its own table of `(id, parent_id, body)` rows.
pub struct PgResourceDao<R> {
    pool: PgPool,
    table: String,
    _phantom: PhantomData<R>,
}

impl<R: Resource> PgResourceDao<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: DatabaseManager::quote_identifier(R::TYPE.table_name()),
            _phantom: PhantomData,
        }
    }

    fn decode(body: Value) -> Result<R, ResourceError> {
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl<R: Resource> ResourceDao<R> for PgResourceDao<R> {
    async fn get_resource(&self, resource_id: &str) -> Result<Option<R>, ResourceError> {
        let sql = format!("SELECT body FROM {} WHERE id = $1", self.table);
        let body: Option<Value> = sqlx::query_scalar(&sql)
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?;

        body.map(Self::decode).transpose()
    }

    async fn get_resources(&self, parent_id: &str) -> Result<Vec<R>, ResourceError> {
        let sql = format!("SELECT body FROM {} WHERE parent_id = $1 ORDER BY id", self.table);
        let bodies: Vec<Value> = sqlx::query_scalar(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;

        debug!("Loaded {} {} rows for parent {}", bodies.len(), R::TYPE, parent_id);
        bodies.into_iter().map(Self::decode).collect()
    }

    async fn save_resource(&self, resource: &R) -> Result<(), ResourceError> {
        let mut stored = resource.clone();
        stored.clear_child_resources();
        let body = serde_json::to_value(&stored)?;

        let sql = format!(
            "INSERT INTO {} (id, parent_id, body) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET parent_id = EXCLUDED.parent_id, body = EXCLUDED.body",
            self.table
        );
        sqlx::query(&sql)
            .bind(stored.id())
            .bind(stored.parent_id())
            .bind(body)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<(), ResourceError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        sqlx::query(&sql).bind(resource_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn resource_exists(&self, resource_id: &str) -> Result<bool, ResourceError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", self.table);
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(resource_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
