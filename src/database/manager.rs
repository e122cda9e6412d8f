use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::resource::ResourceType;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Owns the PostgreSQL pool shared by the resource DAOs and the user store
#[derive(Clone)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Connect using `DATABASE_URL` and the configured pool limits
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool ({} max connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the resource and user tables. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for statement in Self::schema_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        info!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    fn schema_statements() -> Vec<String> {
        let mut statements = Vec::new();

        for resource_type in ResourceType::ALL {
            let table = resource_type.table_name();
            statements.push(format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    parent_id TEXT NOT NULL,
                    body JSONB NOT NULL
                )",
                Self::quote_identifier(table)
            ));
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} (parent_id)",
                Self::quote_identifier(&format!("{}_parent_id_idx", table)),
                Self::quote_identifier(table)
            ));
        }

        statements.push(
            "CREATE TABLE IF NOT EXISTS users (
                user_id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_email_verified BOOLEAN NOT NULL DEFAULT FALSE,
                is_administrator BOOLEAN NOT NULL DEFAULT FALSE,
                session_epoch BIGINT NOT NULL DEFAULT 0,
                verification_code TEXT,
                password_reset_code TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
            .to_string(),
        );

        statements
    }

    /// Quote SQL identifier to prevent injection
    pub(crate) fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(DatabaseManager::quote_identifier("crags"), "\"crags\"");
        assert_eq!(DatabaseManager::quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn schema_covers_every_resource_table() {
        let statements = DatabaseManager::schema_statements();
        for resource_type in ResourceType::ALL {
            let create = format!("CREATE TABLE IF NOT EXISTS \"{}\"", resource_type.table_name());
            assert!(
                statements.iter().any(|s| s.starts_with(&create)),
                "missing table for {}",
                resource_type
            );
        }
        assert!(statements.iter().any(|s| s.contains("CREATE TABLE IF NOT EXISTS users")));
    }

    #[tokio::test]
    async fn connect_requires_database_url() {
        let config = DatabaseConfig {
            url: None,
            max_connections: 1,
            connection_timeout: 1,
        };
        assert!(matches!(
            DatabaseManager::connect(&config).await,
            Err(DatabaseError::ConfigMissing("DATABASE_URL"))
        ));
    }
}
