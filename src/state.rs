use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::database::DatabaseManager;
use crate::resource::Catalog;
use crate::user::{
    AdministratorAuthorizationHandler, AuthorizationHandler, InMemoryUserStore, LocalUserManager,
    LoggingEmailSender, PgUserStore, TokenIssuer, UserAuthorizationHandler, UserManager, UserStore,
};

/// Shared by every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: &'static AppConfig,
    pub catalog: Arc<Catalog>,
    pub user_manager: Arc<dyn UserManager>,
    pub user_authorization: Arc<dyn AuthorizationHandler>,
    pub administrator_authorization: Arc<dyn AuthorizationHandler>,
    pub database: Option<DatabaseManager>,
}

impl AppState {
    /// Wire up storage, identity, and authorization for the configured backend
    pub async fn build(config: &'static AppConfig) -> anyhow::Result<Self> {
        let (catalog, user_store, database): (Catalog, Arc<dyn UserStore>, Option<DatabaseManager>) =
            match config.storage.backend {
                StorageBackend::Postgres => {
                    let database = DatabaseManager::connect(&config.database)
                        .await
                        .context("failed to connect to PostgreSQL")?;
                    database.migrate().await.context("failed to migrate schema")?;
                    let pool = database.pool();
                    (
                        Catalog::postgres(pool.clone()),
                        Arc::new(PgUserStore::new(pool)),
                        Some(database),
                    )
                }
                StorageBackend::Memory => {
                    info!("Using in-memory storage; data is lost on shutdown");
                    (Catalog::in_memory(), Arc::new(InMemoryUserStore::new()), None)
                }
            };

        let tokens = TokenIssuer::from_config(&config.security).context("invalid token settings")?;
        let user_manager = LocalUserManager::new(user_store, tokens, Arc::new(LoggingEmailSender))
            .with_password_cost(config.security.password_hash_cost);

        if let Some(admin) = &config.security.bootstrap_admin {
            let (username, email, password) =
                parse_bootstrap_admin(admin).context("CLIMB_BOOTSTRAP_ADMIN must be username:email:password")?;
            user_manager
                .ensure_administrator(username, email, password)
                .await
                .context("failed to provision bootstrap administrator")?;
        }

        Ok(Self::new(config, Arc::new(catalog), Arc::new(user_manager), database))
    }

    pub fn new(
        config: &'static AppConfig,
        catalog: Arc<Catalog>,
        user_manager: Arc<dyn UserManager>,
        database: Option<DatabaseManager>,
    ) -> Self {
        Self {
            config,
            catalog,
            user_authorization: Arc::new(UserAuthorizationHandler::new(user_manager.clone())),
            administrator_authorization: Arc::new(AdministratorAuthorizationHandler::new(user_manager.clone())),
            user_manager,
            database,
        }
    }
}

/// Split `username:email:password`; the password may itself contain colons
fn parse_bootstrap_admin(value: &str) -> Option<(&str, &str, &str)> {
    let mut parts = value.splitn(3, ':');
    let username = parts.next().filter(|s| !s.is_empty())?;
    let email = parts.next().filter(|s| !s.is_empty())?;
    let password = parts.next().filter(|s| !s.is_empty())?;
    Some((username, email, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_admin_parsing() {
        assert_eq!(
            parse_bootstrap_admin("admin:admin@climbassist.com:pa:ss"),
            Some(("admin", "admin@climbassist.com", "pa:ss"))
        );
        assert_eq!(parse_bootstrap_admin("admin:admin@climbassist.com"), None);
        assert_eq!(parse_bootstrap_admin("::"), None);
    }
}
