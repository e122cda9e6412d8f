use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Alias, AliasType, UserData, UserError};

/// A row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    /// bcrypt hash string; carries its own salt and cost
    pub password_hash: String,
    pub is_email_verified: bool,
    pub is_administrator: bool,
    /// Bumped to revoke every token issued before
    pub session_epoch: i64,
    pub verification_code: Option<String>,
    pub password_reset_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn to_user_data(&self) -> UserData {
        UserData {
            user_id: self.user_id.to_string(),
            username: self.username.clone(),
            email: self.email.clone(),
            is_email_verified: self.is_email_verified,
            is_administrator: self.is_administrator,
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, UserError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserError>;

    /// Emails are stored lowercased; callers pass them normalized
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserError>;

    /// Fails with `UsernameExists` or `EmailExists` on a uniqueness clash
    async fn insert(&self, user: &UserRecord) -> Result<(), UserError>;

    async fn update(&self, user: &UserRecord) -> Result<(), UserError>;

    async fn delete(&self, user_id: Uuid) -> Result<(), UserError>;

    async fn find_by_alias(&self, alias: &Alias) -> Result<Option<UserRecord>, UserError> {
        match alias.alias_type {
            AliasType::Username => self.find_by_username(&alias.value).await,
            AliasType::Email => self.find_by_email(&alias.value.to_lowercase()).await,
        }
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_USER: &str = "SELECT user_id, username, email, password_hash, is_email_verified,
     is_administrator, session_epoch, verification_code, password_reset_code, created_at FROM users";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, UserError> {
        let sql = format!("{} WHERE user_id = $1", SELECT_USER);
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserError> {
        let sql = format!("{} WHERE username = $1", SELECT_USER);
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserError> {
        let sql = format!("{} WHERE email = $1", SELECT_USER);
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), UserError> {
        let result = sqlx::query(
            "INSERT INTO users (user_id, username, email, password_hash, is_email_verified,
                 is_administrator, session_epoch, verification_code, password_reset_code, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_email_verified)
        .bind(user.is_administrator)
        .bind(user.session_epoch)
        .bind(&user.verification_code)
        .bind(&user.password_reset_code)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some(constraint) if constraint.contains("email") => {
                        Err(UserError::EmailExists(user.email.clone()))
                    }
                    _ => Err(UserError::UsernameExists(user.username.clone())),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, user: &UserRecord) -> Result<(), UserError> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, is_email_verified = $3,
                 is_administrator = $4, session_epoch = $5, verification_code = $6, password_reset_code = $7
             WHERE user_id = $1",
        )
        .bind(user.user_id)
        .bind(&user.password_hash)
        .bind(user.is_email_verified)
        .bind(user.is_administrator)
        .bind(user.session_epoch)
        .bind(&user.verification_code)
        .bind(&user.password_reset_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), UserError> {
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>, UserError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserError> {
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &UserRecord) -> Result<(), UserError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(UserError::UsernameExists(user.username.clone()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(UserError::EmailExists(user.email.clone()));
        }
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &UserRecord) -> Result<(), UserError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.user_id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(UserError::UserNotFound(user.username.clone())),
        }
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), UserError> {
        self.users.write().await.remove(&user_id);
        Ok(())
    }
}
