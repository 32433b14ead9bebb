use std::sync::Arc;

use crate::auth::error::AuthError;
use crate::auth::password::verify_password_blocking;
use crate::auth::store::TokenStore;
use crate::auth::token::{Claims, TokenIssuer, TokenKind, TokenPair, TokenValidator};
use crate::config::AuthConfig;
use crate::error::AppError;
use crate::repository::UserRepository;

/// Login, refresh, logout and per-request authentication.
///
/// Shared by all workers behind `web::Data`; holds no per-request state.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    store: TokenStore,
    secure_cookies: bool,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, store: TokenStore, config: &AuthConfig) -> Self {
        Self {
            users,
            issuer: TokenIssuer::new(config),
            validator: TokenValidator::new(config),
            store,
            secure_cookies: config.secure_cookies,
        }
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Checks the credentials and issues a persisted token pair.
    ///
    /// An unknown username and a wrong password both fail with
    /// [`AuthError::InvalidCredentials`].
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = match self.users.get_by_username(username).await? {
            Some(user) => user,
            None => {
                log::info!("login rejected for {}", username);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !verify_password_blocking(password.to_string(), user.password_hash).await? {
            log::info!("login rejected for {}", username);
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.issue_persisted(&user.id.to_string()).await?;
        log::info!("user {} logged in", user.id);
        Ok(pair)
    }

    /// Exchanges a live refresh token for a brand-new pair.
    ///
    /// The presented refresh record is consumed before the new pair is
    /// persisted, so each refresh token works at most once. If persisting the
    /// new pair then fails, the caller is left without a refresh token and has
    /// to log in again.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.validator.validate(refresh_token)?;

        if !self.store.consume(TokenKind::Refresh, &claims.jti).await? {
            log::info!("refresh with dead token {} for user {}", claims.jti, claims.sub);
            return Err(AuthError::TokenRevoked.into());
        }

        let pair = self.issue_persisted(&claims.sub).await?;
        log::debug!("rotated refresh token {} -> {}", claims.jti, pair.refresh_jti);
        Ok(pair)
    }

    /// Revokes the access token immediately. The JWT stays cryptographically
    /// valid but fails every later liveness check.
    pub async fn logout(&self, access_token: &str) -> Result<(), AppError> {
        let claims = self.validator.validate(access_token)?;
        self.store.revoke(TokenKind::Access, &claims.jti).await?;
        log::info!("user {} logged out", claims.sub);
        Ok(())
    }

    /// Validates an access token and confirms it is still live.
    pub async fn authenticate(&self, access_token: &str) -> Result<Claims, AuthError> {
        let claims = self.validator.validate(access_token)?;
        if !self.store.is_live(TokenKind::Access, &claims.jti).await? {
            return Err(AuthError::TokenRevoked);
        }
        Ok(claims)
    }

    async fn issue_persisted(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let pair = self.issuer.issue_pair(subject)?;
        self.store.persist(&pair).await?;
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::auth::error::StoreError;
    use crate::auth::store::{KeyValueStore, MemoryStore};
    use crate::repository::MemoryUserRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const SECRET: &str = "service-test-secret-with-32-or-more-bytes";

    async fn setup() -> (AuthService, TokenStore) {
        setup_with(Arc::new(MemoryStore::new())).await
    }

    async fn setup_with(backend: Arc<dyn KeyValueStore>) -> (AuthService, TokenStore) {
        let users = Arc::new(MemoryUserRepository::new());
        users
            .create(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: bcrypt::hash("correct", 4).unwrap(),
            })
            .await
            .unwrap();
        let store = TokenStore::new(backend, Duration::from_millis(200));
        let service = AuthService::new(users, store.clone(), &AuthConfig::with_secret(SECRET));
        (service, store)
    }

    fn is_auth_error(result: &Result<TokenPair, AppError>, expected: fn(&AuthError) -> bool) -> bool {
        matches!(result, Err(AppError::Auth(err)) if expected(err))
    }

    #[actix_rt::test]
    async fn test_login_persists_pair() {
        let (service, store) = setup().await;
        let pair = service.login("alice", "correct").await.unwrap();

        assert_eq!(pair.subject, "1");
        assert!(store.is_live(TokenKind::Access, &pair.access_jti).await.unwrap());
        assert!(store.is_live(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());
        assert_eq!(service.authenticate(&pair.access).await.unwrap().sub, "1");
    }

    #[actix_rt::test]
    async fn test_login_failures_look_the_same() {
        let (service, _) = setup().await;

        let wrong_password = service.login("alice", "incorrect").await;
        let unknown_user = service.login("mallory", "correct").await;

        assert!(is_auth_error(&wrong_password, |e| matches!(e, AuthError::InvalidCredentials)));
        assert!(is_auth_error(&unknown_user, |e| matches!(e, AuthError::InvalidCredentials)));
    }

    #[actix_rt::test]
    async fn test_refresh_rotates_both_tokens() {
        let (service, store) = setup().await;
        let first = service.login("alice", "correct").await.unwrap();
        let second = service.refresh(&first.refresh).await.unwrap();

        assert_ne!(first.access_jti, second.access_jti);
        assert_ne!(first.refresh_jti, second.refresh_jti);
        assert!(!store.is_live(TokenKind::Refresh, &first.refresh_jti).await.unwrap());
        assert!(store.is_live(TokenKind::Refresh, &second.refresh_jti).await.unwrap());

        let replay = service.refresh(&first.refresh).await;
        assert!(is_auth_error(&replay, |e| matches!(e, AuthError::TokenRevoked)));
    }

    #[actix_rt::test]
    async fn test_access_token_cannot_refresh() {
        let (service, _) = setup().await;
        let pair = service.login("alice", "correct").await.unwrap();

        let result = service.refresh(&pair.access).await;
        assert!(is_auth_error(&result, |e| matches!(e, AuthError::TokenRevoked)));
    }

    #[actix_rt::test]
    async fn test_logout_revokes_only_that_access_token() {
        let (service, _) = setup().await;
        let laptop = service.login("alice", "correct").await.unwrap();
        let phone = service.login("alice", "correct").await.unwrap();

        service.logout(&laptop.access).await.unwrap();

        assert!(matches!(
            service.authenticate(&laptop.access).await,
            Err(AuthError::TokenRevoked)
        ));
        assert!(service.authenticate(&phone.access).await.is_ok());
        // Logout leaves the refresh half alone.
        assert!(service.refresh(&laptop.refresh).await.is_ok());
    }

    #[actix_rt::test]
    async fn test_concurrent_refreshes_succeed_once() {
        let (service, _) = setup().await;
        let pair = service.login("alice", "correct").await.unwrap();

        let (a, b) = futures::join!(service.refresh(&pair.refresh), service.refresh(&pair.refresh));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }

    /// Memory backend whose `refresh:` writes can be switched to fail.
    #[derive(Default)]
    struct RefreshWritesFail {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for RefreshWritesFail {
        async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) && key.starts_with(TokenKind::Refresh.prefix()) {
                return Err(StoreError::Backend("write refused".into()));
            }
            self.inner.set_ex(key, value, ttl).await
        }

        async fn exists(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.exists(key).await
        }

        async fn del(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.del(key).await
        }
    }

    #[actix_rt::test]
    async fn test_login_fails_when_refresh_record_is_not_written() {
        let backend = Arc::new(RefreshWritesFail::default());
        backend.failing.store(true, Ordering::SeqCst);
        let (service, _) = setup_with(backend).await;

        let result = service.login("alice", "correct").await;
        assert!(is_auth_error(&result, |e| matches!(
            e,
            AuthError::StoreUnavailable(StoreError::Backend(_))
        )));
    }

    #[actix_rt::test]
    async fn test_failed_refresh_still_consumes_old_token() {
        let backend = Arc::new(RefreshWritesFail::default());
        let (service, store) = setup_with(backend.clone()).await;
        let pair = service.login("alice", "correct").await.unwrap();

        backend.failing.store(true, Ordering::SeqCst);
        let result = service.refresh(&pair.refresh).await;
        assert!(is_auth_error(&result, |e| matches!(e, AuthError::StoreUnavailable(_))));
        assert!(!store.is_live(TokenKind::Refresh, &pair.refresh_jti).await.unwrap());

        // At most once: the store is healthy again but the old token stays dead.
        backend.failing.store(false, Ordering::SeqCst);
        let retry = service.refresh(&pair.refresh).await;
        assert!(is_auth_error(&retry, |e| matches!(e, AuthError::TokenRevoked)));
        assert!(service.login("alice", "correct").await.is_ok());
    }
}
