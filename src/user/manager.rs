use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::email::{EmailKind, EmailMessage, EmailSender};
use super::store::{UserRecord, UserStore};
use super::token::{TokenError, TokenIssuer, TokenKind};
use super::{Alias, UserData, UserError, UserSessionData};

/// Account and session operations behind the `/v1/user` endpoints
#[async_trait]
pub trait UserManager: Send + Sync {
    /// Create an unverified account and send its initial verification code
    async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserData, UserError>;

    async fn sign_in(&self, alias: &Alias, password: &str) -> Result<UserSessionData, UserError>;

    /// `Err(AccessTokenExpired)` when the token is otherwise good but too old to use
    async fn is_signed_in(&self, access_token: &str) -> Result<bool, UserError>;

    /// A fresh access token, or `SessionExpired` when the refresh token is no longer usable
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, UserError>;

    async fn get_user_data(&self, access_token: &str) -> Result<UserData, UserError>;

    /// Revokes every outstanding token for the user
    async fn sign_out(&self, access_token: &str) -> Result<(), UserError>;

    async fn delete_user(&self, access_token: &str) -> Result<(), UserError>;

    async fn verify_email(&self, access_token: &str, verification_code: &str) -> Result<(), UserError>;

    async fn send_verification_email(&self, access_token: &str) -> Result<(), UserError>;

    async fn resend_initial_verification_email(&self, alias: &Alias) -> Result<(), UserError>;

    async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserError>;

    async fn send_password_reset_email(&self, alias: &Alias) -> Result<(), UserError>;

    /// Also revokes every outstanding token for the user
    async fn reset_password(&self, alias: &Alias, verification_code: &str, new_password: &str)
        -> Result<(), UserError>;
}

/// Self-hosted identity service: accounts in a `UserStore`, sessions as signed tokens
pub struct LocalUserManager {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    email_sender: Arc<dyn EmailSender>,
    password_cost: u32,
}

impl LocalUserManager {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenIssuer, email_sender: Arc<dyn EmailSender>) -> Self {
        Self {
            store,
            tokens,
            email_sender,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// bcrypt work factor for passwords hashed from now on
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// Create or promote an administrator account. Used to seed the first admin at startup.
    pub async fn ensure_administrator(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserData, UserError> {
        if let Some(mut user) = self.store.find_by_username(username).await? {
            if !user.is_administrator || !user.is_email_verified {
                user.is_administrator = true;
                user.is_email_verified = true;
                self.store.update(&user).await?;
                info!("Promoted {} to administrator", username);
            }
            return Ok(user.to_user_data());
        }

        let mut user = self.new_record(username, email, password).await?;
        user.is_email_verified = true;
        user.is_administrator = true;
        self.store.insert(&user).await?;
        info!("Created administrator {}", username);
        Ok(user.to_user_data())
    }

    /// Resolve an access token to its stored, non-revoked user
    async fn authenticate(&self, access_token: &str) -> Result<UserRecord, UserError> {
        let claims = self
            .tokens
            .verify(access_token, TokenKind::Access)
            .map_err(|e| match e {
                TokenError::Expired => UserError::AccessTokenExpired,
                _ => UserError::InvalidToken,
            })?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(UserError::InvalidToken)?;

        if user.session_epoch != claims.epoch {
            debug!("Rejected revoked token for {}", user.username);
            return Err(UserError::InvalidToken);
        }
        Ok(user)
    }

    async fn new_record(&self, username: &str, email: &str, password: &str) -> Result<UserRecord, UserError> {
        Ok(UserRecord {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_lowercase(),
            password_hash: self.hash_password(password).await?,
            is_email_verified: false,
            is_administrator: false,
            session_epoch: 0,
            verification_code: None,
            password_reset_code: None,
            created_at: Utc::now(),
        })
    }

    /// Hashing runs on the blocking pool
    async fn hash_password(&self, password: &str) -> Result<String, UserError> {
        let password = password.to_string();
        let cost = self.password_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| UserError::PasswordHashing(e.to_string()))?
            .map_err(|e| UserError::PasswordHashing(e.to_string()))
    }

    async fn check_password(&self, user: &UserRecord, password: &str) -> Result<(), UserError> {
        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| UserError::PasswordHashing(e.to_string()))?
            .map_err(|e| UserError::PasswordHashing(e.to_string()))?;

        if matches {
            Ok(())
        } else {
            Err(UserError::IncorrectPassword)
        }
    }

    async fn find_user(&self, alias: &Alias) -> Result<UserRecord, UserError> {
        self.store
            .find_by_alias(alias)
            .await?
            .ok_or_else(|| UserError::UserNotFound(alias.value.clone()))
    }

    fn issue(&self, user: &UserRecord, kind: TokenKind) -> Result<String, UserError> {
        self.tokens
            .issue(user, kind)
            .map_err(|e| UserError::Configuration(e.to_string()))
    }

    fn send_code(&self, kind: EmailKind, user: &UserRecord, code: String) {
        self.email_sender.send(EmailMessage {
            kind,
            to: user.email.clone(),
            username: user.username.clone(),
            code,
        });
    }

    async fn issue_verification_code(&self, mut user: UserRecord) -> Result<(), UserError> {
        let code = verification_code();
        user.verification_code = Some(code.clone());
        self.store.update(&user).await?;
        self.send_code(EmailKind::Verification, &user, code);
        Ok(())
    }
}

#[async_trait]
impl UserManager for LocalUserManager {
    async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserData, UserError> {
        let email = email.to_lowercase();
        if self.store.find_by_username(username).await?.is_some() {
            return Err(UserError::UsernameExists(username.to_string()));
        }
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(UserError::EmailExists(email));
        }

        let mut user = self.new_record(username, &email, password).await?;
        let code = verification_code();
        user.verification_code = Some(code.clone());
        self.store.insert(&user).await?;
        info!("Registered user {}", username);

        self.send_code(EmailKind::Verification, &user, code);
        Ok(user.to_user_data())
    }

    async fn sign_in(&self, alias: &Alias, password: &str) -> Result<UserSessionData, UserError> {
        let user = self.find_user(alias).await?;
        self.check_password(&user, password).await?;

        debug!("Signed in {}", user.username);
        Ok(UserSessionData {
            access_token: self.issue(&user, TokenKind::Access)?,
            refresh_token: self.issue(&user, TokenKind::Refresh)?,
        })
    }

    async fn is_signed_in(&self, access_token: &str) -> Result<bool, UserError> {
        match self.authenticate(access_token).await {
            Ok(_) => Ok(true),
            Err(UserError::InvalidToken) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, UserError> {
        let claims = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|_| UserError::SessionExpired)?;

        match self.store.find_by_id(claims.sub).await? {
            Some(user) if user.session_epoch == claims.epoch => self.issue(&user, TokenKind::Access),
            _ => Err(UserError::SessionExpired),
        }
    }

    async fn get_user_data(&self, access_token: &str) -> Result<UserData, UserError> {
        Ok(self.authenticate(access_token).await?.to_user_data())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), UserError> {
        let mut user = self.authenticate(access_token).await?;
        user.session_epoch += 1;
        self.store.update(&user).await?;
        debug!("Signed out {}", user.username);
        Ok(())
    }

    async fn delete_user(&self, access_token: &str) -> Result<(), UserError> {
        let user = self.authenticate(access_token).await?;
        self.store.delete(user.user_id).await?;
        info!("Deleted user {}", user.username);
        Ok(())
    }

    async fn verify_email(&self, access_token: &str, verification_code: &str) -> Result<(), UserError> {
        let mut user = self.authenticate(access_token).await?;
        if user.is_email_verified {
            return Err(UserError::EmailAlreadyVerified);
        }
        if user.verification_code.as_deref() != Some(verification_code) {
            return Err(UserError::IncorrectVerificationCode);
        }

        user.is_email_verified = true;
        user.verification_code = None;
        self.store.update(&user).await
    }

    async fn send_verification_email(&self, access_token: &str) -> Result<(), UserError> {
        let user = self.authenticate(access_token).await?;
        if user.is_email_verified {
            return Err(UserError::EmailAlreadyVerified);
        }
        self.issue_verification_code(user).await
    }

    async fn resend_initial_verification_email(&self, alias: &Alias) -> Result<(), UserError> {
        let user = self.find_user(alias).await?;
        if user.is_email_verified {
            return Err(UserError::EmailAlreadyVerified);
        }
        self.issue_verification_code(user).await
    }

    async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        let mut user = self.authenticate(access_token).await?;
        self.check_password(&user, current_password).await?;

        user.password_hash = self.hash_password(new_password).await?;
        self.store.update(&user).await
    }

    async fn send_password_reset_email(&self, alias: &Alias) -> Result<(), UserError> {
        let mut user = self.find_user(alias).await?;
        if !user.is_email_verified {
            return Err(UserError::EmailNotVerified);
        }

        let code = verification_code();
        user.password_reset_code = Some(code.clone());
        self.store.update(&user).await?;
        self.send_code(EmailKind::PasswordReset, &user, code);
        Ok(())
    }

    async fn reset_password(
        &self,
        alias: &Alias,
        verification_code: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        let mut user = self.find_user(alias).await?;
        if !user.is_email_verified {
            return Err(UserError::EmailNotVerified);
        }
        if user.password_reset_code.as_deref() != Some(verification_code) {
            return Err(UserError::IncorrectVerificationCode);
        }

        user.password_hash = self.hash_password(new_password).await?;
        user.password_reset_code = None;
        user.session_epoch += 1;
        self.store.update(&user).await?;
        info!("Reset password for {}", user.username);
        Ok(())
    }
}

/// Six decimal digits
fn verification_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::email::RecordingEmailSender;
    use crate::user::store::InMemoryUserStore;
    use chrono::Duration;

    const PASSWORD: &str = "fascinating";
    const NEW_PASSWORD: &str = "illogical";

    struct Fixture {
        manager: LocalUserManager,
        store: Arc<InMemoryUserStore>,
        emails: Arc<RecordingEmailSender>,
    }

    fn fixture_with_ttl(access_ttl: Duration) -> Fixture {
        let store = Arc::new(InMemoryUserStore::new());
        let emails = Arc::new(RecordingEmailSender::default());
        let tokens = TokenIssuer::new("test-secret", access_ttl, Duration::days(1)).unwrap();
        Fixture {
            manager: LocalUserManager::new(store.clone(), tokens, emails.clone()).with_password_cost(4),
            store,
            emails,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_ttl(Duration::minutes(5))
    }

    async fn registered(f: &Fixture) -> UserSessionData {
        f.manager
            .register("spock", "Spock@Vulcan.org", PASSWORD)
            .await
            .unwrap();
        f.manager.sign_in(&Alias::username("spock"), PASSWORD).await.unwrap()
    }

    async fn verified(f: &Fixture) -> UserSessionData {
        let session = registered(f).await;
        let code = f.emails.last().unwrap().code;
        f.manager.verify_email(&session.access_token, &code).await.unwrap();
        session
    }

    #[tokio::test]
    async fn register_sends_code_and_rejects_duplicates() {
        let f = fixture();
        let user = f.manager.register("spock", "Spock@Vulcan.org", PASSWORD).await.unwrap();
        assert_eq!(user.email, "spock@vulcan.org");
        assert!(!user.is_email_verified);
        assert!(!user.is_administrator);

        let email = f.emails.last().unwrap();
        assert_eq!(email.kind, EmailKind::Verification);
        assert_eq!(email.code.len(), 6);
        assert!(email.code.chars().all(|c| c.is_ascii_digit()));

        assert!(matches!(
            f.manager.register("spock", "other@vulcan.org", PASSWORD).await,
            Err(UserError::UsernameExists(_))
        ));
        assert!(matches!(
            f.manager.register("sarek", "SPOCK@vulcan.org", PASSWORD).await,
            Err(UserError::EmailExists(_))
        ));
    }

    #[tokio::test]
    async fn passwords_are_stored_as_salted_bcrypt_hashes() {
        let f = fixture();
        f.manager.register("spock", "spock@vulcan.org", PASSWORD).await.unwrap();
        f.manager.register("sarek", "sarek@vulcan.org", PASSWORD).await.unwrap();

        let spock = f.store.find_by_username("spock").await.unwrap().unwrap();
        let sarek = f.store.find_by_username("sarek").await.unwrap().unwrap();
        assert!(spock.password_hash.starts_with("$2"));
        assert!(!spock.password_hash.contains(PASSWORD));
        assert_ne!(spock.password_hash, sarek.password_hash);
        assert!(bcrypt::verify(PASSWORD, &spock.password_hash).unwrap());
    }

    #[test]
    fn verification_codes_are_six_digits() {
        for _ in 0..100 {
            let code = verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn sign_in_by_username_or_email() {
        let f = fixture();
        let session = registered(&f).await;
        assert!(f.manager.is_signed_in(&session.access_token).await.unwrap());

        f.manager
            .sign_in(&Alias::email("spock@vulcan.org"), PASSWORD)
            .await
            .unwrap();
        assert!(matches!(
            f.manager.sign_in(&Alias::username("spock"), "wrong-password").await,
            Err(UserError::IncorrectPassword)
        ));
        assert!(matches!(
            f.manager.sign_in(&Alias::username("kirk"), PASSWORD).await,
            Err(UserError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn garbage_tokens_are_not_signed_in() {
        let f = fixture();
        assert!(!f.manager.is_signed_in("garbage").await.unwrap());
        let session = registered(&f).await;
        // A refresh token is not an access token
        assert!(!f.manager.is_signed_in(&session.refresh_token).await.unwrap());
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshable() {
        let f = fixture_with_ttl(Duration::minutes(-5));
        let session = registered(&f).await;

        assert!(matches!(
            f.manager.is_signed_in(&session.access_token).await,
            Err(UserError::AccessTokenExpired)
        ));
        // The refreshed token is issued with the same expired TTL, but refresh itself works
        assert!(f.manager.refresh_access_token(&session.refresh_token).await.is_ok());
        assert!(matches!(
            f.manager.refresh_access_token("garbage").await,
            Err(UserError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn sign_out_revokes_both_tokens() {
        let f = fixture();
        let session = registered(&f).await;
        f.manager.sign_out(&session.access_token).await.unwrap();

        assert!(!f.manager.is_signed_in(&session.access_token).await.unwrap());
        assert!(matches!(
            f.manager.refresh_access_token(&session.refresh_token).await,
            Err(UserError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn verify_email_checks_the_code() {
        let f = fixture();
        let session = registered(&f).await;

        assert!(matches!(
            f.manager.verify_email(&session.access_token, "000000x").await,
            Err(UserError::IncorrectVerificationCode)
        ));

        let code = f.emails.last().unwrap().code;
        f.manager.verify_email(&session.access_token, &code).await.unwrap();
        assert!(f.manager.get_user_data(&session.access_token).await.unwrap().is_email_verified);

        assert!(matches!(
            f.manager.verify_email(&session.access_token, &code).await,
            Err(UserError::EmailAlreadyVerified)
        ));
        assert!(matches!(
            f.manager.send_verification_email(&session.access_token).await,
            Err(UserError::EmailAlreadyVerified)
        ));
    }

    #[tokio::test]
    async fn resending_replaces_the_verification_code() {
        let f = fixture();
        let session = registered(&f).await;
        let first = f.emails.last().unwrap().code;

        f.manager
            .resend_initial_verification_email(&Alias::email("spock@vulcan.org"))
            .await
            .unwrap();
        assert_eq!(f.emails.count(), 2);
        let second = f.emails.last().unwrap().code;

        if first != second {
            assert!(f.manager.verify_email(&session.access_token, &first).await.is_err());
        }
        f.manager.verify_email(&session.access_token, &second).await.unwrap();

        assert!(matches!(
            f.manager
                .resend_initial_verification_email(&Alias::username("kirk"))
                .await,
            Err(UserError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn change_password_keeps_the_session() {
        let f = fixture();
        let session = registered(&f).await;

        assert!(matches!(
            f.manager
                .change_password(&session.access_token, "wrong-password", NEW_PASSWORD)
                .await,
            Err(UserError::IncorrectPassword)
        ));
        f.manager
            .change_password(&session.access_token, PASSWORD, NEW_PASSWORD)
            .await
            .unwrap();

        assert!(f.manager.is_signed_in(&session.access_token).await.unwrap());
        assert!(f.manager.sign_in(&Alias::username("spock"), PASSWORD).await.is_err());
        f.manager
            .sign_in(&Alias::username("spock"), NEW_PASSWORD)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn password_reset_requires_verified_email() {
        let f = fixture();
        registered(&f).await;
        let alias = Alias::username("spock");

        assert!(matches!(
            f.manager.send_password_reset_email(&alias).await,
            Err(UserError::EmailNotVerified)
        ));
        assert!(matches!(
            f.manager.reset_password(&alias, "123456", NEW_PASSWORD).await,
            Err(UserError::EmailNotVerified)
        ));
    }

    #[tokio::test]
    async fn reset_password_revokes_sessions() {
        let f = fixture();
        let session = verified(&f).await;
        let alias = Alias::email("spock@vulcan.org");

        f.manager.send_password_reset_email(&alias).await.unwrap();
        let email = f.emails.last().unwrap();
        assert_eq!(email.kind, EmailKind::PasswordReset);

        assert!(matches!(
            f.manager.reset_password(&alias, "wrong", NEW_PASSWORD).await,
            Err(UserError::IncorrectVerificationCode)
        ));
        f.manager
            .reset_password(&alias, &email.code, NEW_PASSWORD)
            .await
            .unwrap();

        assert!(!f.manager.is_signed_in(&session.access_token).await.unwrap());
        f.manager.sign_in(&alias, NEW_PASSWORD).await.unwrap();
    }

    #[tokio::test]
    async fn delete_user_removes_the_account() {
        let f = fixture();
        let session = registered(&f).await;
        f.manager.delete_user(&session.access_token).await.unwrap();

        assert!(f.store.find_by_username("spock").await.unwrap().is_none());
        assert!(!f.manager.is_signed_in(&session.access_token).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_administrator_creates_then_promotes() {
        let f = fixture();
        let admin = f
            .manager
            .ensure_administrator("captain-america", "cap@shield.com", PASSWORD)
            .await
            .unwrap();
        assert!(admin.is_administrator);
        assert!(admin.is_email_verified);
        assert_eq!(f.emails.count(), 0);

        f.manager.register("spock", "spock@vulcan.org", PASSWORD).await.unwrap();
        let promoted = f
            .manager
            .ensure_administrator("spock", "spock@vulcan.org", "ignored-password")
            .await
            .unwrap();
        assert!(promoted.is_administrator);
        // Existing passwords are left alone
        f.manager.sign_in(&Alias::username("spock"), PASSWORD).await.unwrap();
    }
}
