use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::errors::AuthError;
use super::password::PasswordHasher;
use super::repo::UserStore;
use super::repo_types::UserAccount;

/// Verifies credentials and hands back the matching account in one step.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Fails with [`AuthError::InvalidCredentials`] for an unknown email and
    /// for a wrong password alike.
    async fn verify_and_resolve(&self, email: &str, password: &str)
        -> Result<UserAccount, AuthError>;
}

/// Authenticator backed by a [`UserStore`] and a [`PasswordHasher`].
pub struct StoreAuthenticator {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    // Verified against when the email is unknown so both misses cost the same.
    dummy_hash: OnceCell<String>,
}

impl StoreAuthenticator {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            store,
            hasher,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Hashed once, on the blocking pool, the first time an unknown email shows up.
    async fn dummy_hash(&self) -> Result<String, AuthError> {
        let digest = self
            .dummy_hash
            .get_or_try_init(|| async {
                let hasher = Arc::clone(&self.hasher);
                tokio::task::spawn_blocking(move || hasher.hash("authflow-dummy-password"))
                    .await
                    .map_err(|e| AuthError::Task(e.to_string()))
                    .and_then(|hashed| hashed.map_err(AuthError::from))
            })
            .await?;
        Ok(digest.clone())
    }

    async fn verify_blocking(&self, password: &str, digest: String) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))
    }
}

#[async_trait]
impl Authenticator for StoreAuthenticator {
    async fn verify_and_resolve(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserAccount, AuthError> {
        let account = self.store.find_by_email(email).await?;

        let Some(account) = account else {
            let dummy = self.dummy_hash().await?;
            self.verify_blocking(password, dummy).await?;
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_blocking(password, account.password_hash.clone()).await? {
            warn!(email = %email, user_id = %account.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        debug!(user_id = %account.id, "credentials verified");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    use super::*;
    use crate::auth::memory::InMemoryUserStore;
    use crate::auth::password::{Argon2Hasher, HashError};
    use crate::auth::repo_types::{NewUserAccount, Role};

    async fn seeded() -> (StoreAuthenticator, UserAccount) {
        let store = Arc::new(InMemoryUserStore::new());
        let hasher = Arc::new(Argon2Hasher::new());
        let account = store
            .insert(UserAccount::new(NewUserAccount {
                firstname: "Edsger".into(),
                lastname: "Dijkstra".into(),
                email: "edsger@example.com".into(),
                password_hash: hasher.hash("goto-considered-harmful").unwrap(),
                role: Role::NormalUser,
            }))
            .await
            .unwrap();
        let auth = StoreAuthenticator::new(store, hasher);
        (auth, account)
    }

    #[tokio::test]
    async fn resolves_account_on_matching_password() {
        let (auth, account) = seeded().await;
        let resolved = auth
            .verify_and_resolve("edsger@example.com", "goto-considered-harmful")
            .await
            .unwrap();
        assert_eq!(resolved, account);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_the_same_way() {
        let (auth, _) = seeded().await;

        let wrong = auth
            .verify_and_resolve("edsger@example.com", "nope-nope-nope")
            .await
            .unwrap_err();
        let unknown = auth
            .verify_and_resolve("ghost@example.com", "goto-considered-harmful")
            .await
            .unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    struct CountingHasher {
        inner: Argon2Hasher,
        hashes: AtomicUsize,
        threads: Mutex<Vec<ThreadId>>,
    }

    impl PasswordHasher for CountingHasher {
        fn hash(&self, plain: &str) -> Result<String, HashError> {
            self.hashes.fetch_add(1, Ordering::SeqCst);
            self.threads.lock().unwrap().push(thread::current().id());
            self.inner.hash(plain)
        }

        fn verify(&self, plain: &str, digest: &str) -> bool {
            self.inner.verify(plain, digest)
        }
    }

    #[tokio::test]
    async fn dummy_hash_is_built_lazily_off_the_executor() {
        let hasher = Arc::new(CountingHasher {
            inner: Argon2Hasher::new(),
            hashes: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
        });
        let auth = StoreAuthenticator::new(Arc::new(InMemoryUserStore::new()), hasher.clone());
        assert_eq!(hasher.hashes.load(Ordering::SeqCst), 0);

        for _ in 0..2 {
            let err = auth
                .verify_and_resolve("ghost@example.com", "whatever-password")
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        assert_eq!(hasher.hashes.load(Ordering::SeqCst), 1);
        let threads = hasher.threads.lock().unwrap();
        assert_ne!(threads[0], thread::current().id());
    }
}
