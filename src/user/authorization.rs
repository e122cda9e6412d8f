use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::manager::UserManager;
use super::{UserError, UserSessionData};

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("User is not signed in.")]
    NotSignedIn,

    #[error("Session has expired. Please sign in again.")]
    SessionExpired,

    #[error("User is not an administrator.")]
    NotAdministrator,

    #[error(transparent)]
    User(#[from] UserError),
}

/// Gate for a class of endpoints. Returns the session to continue with, which
/// carries a new access token when the presented one had expired.
#[async_trait]
pub trait AuthorizationHandler: Send + Sync {
    async fn check_authorization(&self, session: UserSessionData) -> Result<UserSessionData, AuthorizationError>;
}

/// Any signed-in user
pub struct UserAuthorizationHandler {
    user_manager: Arc<dyn UserManager>,
}

impl UserAuthorizationHandler {
    pub fn new(user_manager: Arc<dyn UserManager>) -> Self {
        Self { user_manager }
    }
}

#[async_trait]
impl AuthorizationHandler for UserAuthorizationHandler {
    async fn check_authorization(&self, session: UserSessionData) -> Result<UserSessionData, AuthorizationError> {
        ensure_signed_in(self.user_manager.as_ref(), session).await
    }
}

/// Signed-in users flagged as administrators
pub struct AdministratorAuthorizationHandler {
    user_manager: Arc<dyn UserManager>,
}

impl AdministratorAuthorizationHandler {
    pub fn new(user_manager: Arc<dyn UserManager>) -> Self {
        Self { user_manager }
    }
}

#[async_trait]
impl AuthorizationHandler for AdministratorAuthorizationHandler {
    async fn check_authorization(&self, session: UserSessionData) -> Result<UserSessionData, AuthorizationError> {
        let session = ensure_signed_in(self.user_manager.as_ref(), session).await?;
        let user = self.user_manager.get_user_data(&session.access_token).await?;
        if !user.is_administrator {
            debug!("{} is not an administrator", user.username);
            return Err(AuthorizationError::NotAdministrator);
        }
        Ok(session)
    }
}

async fn ensure_signed_in(
    user_manager: &dyn UserManager,
    session: UserSessionData,
) -> Result<UserSessionData, AuthorizationError> {
    let session = match user_manager.is_signed_in(&session.access_token).await {
        Ok(true) => return Ok(session),
        Ok(false) => return Err(AuthorizationError::NotSignedIn),
        Err(UserError::AccessTokenExpired) => {
            let access_token = user_manager
                .refresh_access_token(&session.refresh_token)
                .await
                .map_err(|e| match e {
                    UserError::SessionExpired => AuthorizationError::SessionExpired,
                    other => AuthorizationError::User(other),
                })?;
            debug!("Refreshed expired access token");
            UserSessionData {
                access_token,
                refresh_token: session.refresh_token,
            }
        }
        Err(e) => return Err(e.into()),
    };

    if user_manager.is_signed_in(&session.access_token).await? {
        Ok(session)
    } else {
        Err(AuthorizationError::NotSignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{Alias, UserData};
    use std::collections::HashSet;
    use std::sync::Mutex;

    const ACCESS_TOKEN: &str = "access token";
    const NEW_ACCESS_TOKEN: &str = "new access token";
    const REFRESH_TOKEN: &str = "refresh token";

    /// Scripted user manager that records the calls made to it
    struct MockUserManager {
        signed_in: HashSet<&'static str>,
        expired: HashSet<&'static str>,
        is_administrator: bool,
        calls: Mutex<Vec<String>>,
    }

    impl MockUserManager {
        fn new(signed_in: &[&'static str], expired: &[&'static str], is_administrator: bool) -> Arc<Self> {
            Arc::new(Self {
                signed_in: signed_in.iter().copied().collect(),
                expired: expired.iter().copied().collect(),
                is_administrator,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserManager for MockUserManager {
        async fn register(&self, _: &str, _: &str, _: &str) -> Result<UserData, UserError> {
            unimplemented!()
        }

        async fn sign_in(&self, _: &Alias, _: &str) -> Result<UserSessionData, UserError> {
            unimplemented!()
        }

        async fn is_signed_in(&self, access_token: &str) -> Result<bool, UserError> {
            self.record(format!("is_signed_in({})", access_token));
            if self.expired.contains(access_token) {
                return Err(UserError::AccessTokenExpired);
            }
            Ok(self.signed_in.contains(access_token))
        }

        async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, UserError> {
            self.record(format!("refresh_access_token({})", refresh_token));
            Ok(NEW_ACCESS_TOKEN.to_string())
        }

        async fn get_user_data(&self, access_token: &str) -> Result<UserData, UserError> {
            self.record(format!("get_user_data({})", access_token));
            Ok(UserData {
                user_id: "S179-276SP".to_string(),
                username: "captain-america".to_string(),
                email: "cap@shield.com".to_string(),
                is_email_verified: true,
                is_administrator: self.is_administrator,
            })
        }

        async fn sign_out(&self, _: &str) -> Result<(), UserError> {
            unimplemented!()
        }

        async fn delete_user(&self, _: &str) -> Result<(), UserError> {
            unimplemented!()
        }

        async fn verify_email(&self, _: &str, _: &str) -> Result<(), UserError> {
            unimplemented!()
        }

        async fn send_verification_email(&self, _: &str) -> Result<(), UserError> {
            unimplemented!()
        }

        async fn resend_initial_verification_email(&self, _: &Alias) -> Result<(), UserError> {
            unimplemented!()
        }

        async fn change_password(&self, _: &str, _: &str, _: &str) -> Result<(), UserError> {
            unimplemented!()
        }

        async fn send_password_reset_email(&self, _: &Alias) -> Result<(), UserError> {
            unimplemented!()
        }

        async fn reset_password(&self, _: &Alias, _: &str, _: &str) -> Result<(), UserError> {
            unimplemented!()
        }
    }

    fn session() -> UserSessionData {
        UserSessionData {
            access_token: ACCESS_TOKEN.to_string(),
            refresh_token: REFRESH_TOKEN.to_string(),
        }
    }

    fn refreshed_session() -> UserSessionData {
        UserSessionData {
            access_token: NEW_ACCESS_TOKEN.to_string(),
            refresh_token: REFRESH_TOKEN.to_string(),
        }
    }

    fn refresh_calls() -> Vec<String> {
        vec![
            format!("is_signed_in({})", ACCESS_TOKEN),
            format!("refresh_access_token({})", REFRESH_TOKEN),
            format!("is_signed_in({})", NEW_ACCESS_TOKEN),
        ]
    }

    #[tokio::test]
    async fn administrator_keeps_original_session() {
        let manager = MockUserManager::new(&[ACCESS_TOKEN], &[], true);
        let handler = AdministratorAuthorizationHandler::new(manager.clone());

        assert_eq!(handler.check_authorization(session()).await.unwrap(), session());
        assert_eq!(manager.calls()[0], format!("is_signed_in({})", ACCESS_TOKEN));
    }

    #[tokio::test]
    async fn administrator_with_expired_token_gets_refreshed_session() {
        let manager = MockUserManager::new(&[NEW_ACCESS_TOKEN], &[ACCESS_TOKEN], true);
        let handler = AdministratorAuthorizationHandler::new(manager.clone());

        assert_eq!(handler.check_authorization(session()).await.unwrap(), refreshed_session());
        assert_eq!(manager.calls()[..3], refresh_calls()[..]);
        assert_eq!(manager.calls()[3], format!("get_user_data({})", NEW_ACCESS_TOKEN));
    }

    #[tokio::test]
    async fn signed_in_non_administrator_is_rejected() {
        let manager = MockUserManager::new(&[ACCESS_TOKEN], &[], false);
        let handler = AdministratorAuthorizationHandler::new(manager.clone());

        assert!(matches!(
            handler.check_authorization(session()).await,
            Err(AuthorizationError::NotAdministrator)
        ));
    }

    #[tokio::test]
    async fn non_administrator_with_expired_token_is_rejected_after_refresh() {
        let manager = MockUserManager::new(&[NEW_ACCESS_TOKEN], &[ACCESS_TOKEN], false);
        let handler = AdministratorAuthorizationHandler::new(manager.clone());

        assert!(matches!(
            handler.check_authorization(session()).await,
            Err(AuthorizationError::NotAdministrator)
        ));
        assert_eq!(manager.calls()[..3], refresh_calls()[..]);
    }

    #[tokio::test]
    async fn not_signed_in_is_rejected() {
        let manager = MockUserManager::new(&[], &[], true);
        let handler = AdministratorAuthorizationHandler::new(manager.clone());

        assert!(matches!(
            handler.check_authorization(session()).await,
            Err(AuthorizationError::NotSignedIn)
        ));
        assert_eq!(manager.calls(), vec![format!("is_signed_in({})", ACCESS_TOKEN)]);
    }

    #[tokio::test]
    async fn not_signed_in_after_refresh_is_rejected() {
        let manager = MockUserManager::new(&[], &[ACCESS_TOKEN], true);
        let handler = AdministratorAuthorizationHandler::new(manager.clone());

        assert!(matches!(
            handler.check_authorization(session()).await,
            Err(AuthorizationError::NotSignedIn)
        ));
        assert_eq!(manager.calls(), refresh_calls());
    }

    #[tokio::test]
    async fn user_handler_skips_the_administrator_check() {
        let manager = MockUserManager::new(&[NEW_ACCESS_TOKEN], &[ACCESS_TOKEN], false);
        let handler = UserAuthorizationHandler::new(manager.clone());

        assert_eq!(handler.check_authorization(session()).await.unwrap(), refreshed_session());
        assert_eq!(manager.calls(), refresh_calls());
    }
}
