use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn, Span};
use uuid::Uuid;

use crate::auth::{
    authenticator::{Authenticator, StoreAuthenticator},
    claims::TokenKind,
    dto::{AuthResponse, AuthResult, LoginRequest, RegisterRequest},
    errors::AuthError,
    jwt::{JwtKeys, TokenIssuer},
    password::{Argon2Hasher, PasswordHasher},
    repo::{StoreError, UserStore},
    repo_types::{NewUserAccount, Role, UserAccount},
};
use crate::config::{AuthConfig, JwtConfig};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(mut request: RegisterRequest) -> Result<RegisterRequest, AuthError> {
    request.email = normalize_email(&request.email);
    request.firstname = request.firstname.trim().to_owned();
    request.lastname = request.lastname.trim().to_owned();

    if !is_valid_email(&request.email) {
        warn!(email = %request.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short".into()));
    }
    if request.firstname.is_empty() || request.lastname.is_empty() {
        warn!("missing name");
        return Err(AuthError::Validation("First and last name are required".into()));
    }
    Ok(request)
}

/// Registration and login orchestration over injected collaborators.
///
/// Every collaborator call runs under the configured deadline and the steps
/// of one call run strictly in sequence; the first failure ends the call.
pub struct AuthWorkflow {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    authenticator: Arc<dyn Authenticator>,
    tokens: Arc<dyn TokenIssuer>,
    call_timeout: Duration,
    include_user_id: bool,
}

impl AuthWorkflow {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        authenticator: Arc<dyn Authenticator>,
        tokens: Arc<dyn TokenIssuer>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            authenticator,
            tokens,
            call_timeout: config.call_timeout(),
            include_user_id: config.include_user_id,
        }
    }

    /// Argon2 hashing, store-backed credential checks and HS256 tokens.
    pub fn with_defaults(
        store: Arc<dyn UserStore>,
        jwt: &JwtConfig,
        config: &AuthConfig,
    ) -> Self {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new());
        let authenticator = Arc::new(StoreAuthenticator::new(
            Arc::clone(&store),
            Arc::clone(&hasher),
        ));
        let tokens = Arc::new(JwtKeys::from(jwt));
        Self::new(store, hasher, authenticator, tokens, config)
    }

    /// Shapes a result into the transport payload.
    pub fn response(&self, result: AuthResult) -> AuthResponse {
        result.into_response(self.include_user_id)
    }

    #[instrument(skip_all, fields(email = tracing::field::Empty))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResult, AuthError> {
        let request = validate_registration(request)?;
        Span::current().record("email", request.email.as_str());

        // Ensure email is not taken
        let existing = self
            .bounded("store.find_by_email", async {
                self.store
                    .find_by_email(&request.email)
                    .await
                    .map_err(AuthError::from)
            })
            .await?;
        if existing.is_some() {
            warn!(email = %request.email, "email already registered");
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = self
            .bounded("hasher.hash", self.hash_off_executor(request.password))
            .await?;

        let account = UserAccount::new(NewUserAccount {
            firstname: request.firstname,
            lastname: request.lastname,
            email: request.email,
            password_hash,
            role: Role::NormalUser,
        });

        let account_id = account.id;
        let email = account.email.clone();
        let inserted = self
            .bounded("store.insert", async {
                self.store.insert(account).await.map_err(|e| {
                    if let StoreError::ConstraintViolation(ref detail) = e {
                        warn!(%detail, "registration lost a uniqueness race");
                    } else {
                        error!(error = %e, "create user failed");
                    }
                    AuthError::from(e)
                })
            })
            .await;

        let account = match inserted {
            Ok(account) => account,
            Err(AuthError::Timeout(step)) => {
                self.reconcile_late_insert(&email, account_id, step).await?
            }
            Err(e) => return Err(e),
        };

        let result = self.issue_pair(&account).await?;
        info!(user_id = %account.id, email = %account.email, "user registered");
        Ok(result)
    }

    /// An insert that missed its deadline may still have committed; if our
    /// row is there the registration succeeded.
    async fn reconcile_late_insert(
        &self,
        email: &str,
        account_id: Uuid,
        step: &'static str,
    ) -> Result<UserAccount, AuthError> {
        let found = self
            .bounded("store.find_by_email", async {
                self.store.find_by_email(email).await.map_err(AuthError::from)
            })
            .await?;
        match found {
            Some(account) if account.id == account_id => {
                warn!(user_id = %account_id, "insert answered late but committed");
                Ok(account)
            }
            _ => Err(AuthError::Timeout(step)),
        }
    }

    #[instrument(skip_all, fields(email = tracing::field::Empty))]
    pub async fn authenticate(&self, request: LoginRequest) -> Result<AuthResult, AuthError> {
        let email = normalize_email(&request.email);
        Span::current().record("email", email.as_str());

        let account = self
            .bounded(
                "authenticator.verify_and_resolve",
                self.authenticator
                    .verify_and_resolve(&email, &request.password),
            )
            .await?;

        let result = self.issue_pair(&account).await?;
        info!(user_id = %account.id, email = %account.email, "user logged in");
        Ok(result)
    }

    /// Trades a valid refresh token for a fresh access/refresh pair.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResult, AuthError> {
        let account = self.resolve_token(refresh_token, TokenKind::Refresh).await?;
        let result = self.issue_pair(&account).await?;
        info!(user_id = %account.id, "tokens refreshed");
        Ok(result)
    }

    /// Account behind a valid access token.
    #[instrument(skip_all)]
    pub async fn current_user(&self, access_token: &str) -> Result<UserAccount, AuthError> {
        self.resolve_token(access_token, TokenKind::Access).await
    }

    async fn resolve_token(&self, token: &str, kind: TokenKind) -> Result<UserAccount, AuthError> {
        let claims = self
            .bounded("tokens.verify", async {
                self.tokens.verify(token, kind).await.map_err(|e| {
                    warn!(error = %e, %kind, "token rejected");
                    AuthError::InvalidToken(e)
                })
            })
            .await?;
        self.resolve_account(claims.sub).await
    }

    async fn resolve_account(&self, user_id: Uuid) -> Result<UserAccount, AuthError> {
        let account = self
            .bounded("store.find_by_id", async {
                self.store.find_by_id(user_id).await.map_err(AuthError::from)
            })
            .await?;
        account.ok_or_else(|| {
            error!(user_id = %user_id, "account missing for a verified identity");
            AuthError::UserNotFound
        })
    }

    async fn issue_pair(&self, account: &UserAccount) -> Result<AuthResult, AuthError> {
        let token = self.issue(account, TokenKind::Access).await?;
        let refresh_token = self.issue(account, TokenKind::Refresh).await?;
        Ok(AuthResult {
            token,
            user_id: account.id,
            refresh_token,
        })
    }

    async fn issue(&self, account: &UserAccount, kind: TokenKind) -> Result<String, AuthError> {
        self.bounded("tokens.issue", async {
            self.tokens.issue(account, kind).await.map_err(|e| {
                error!(error = %e, %kind, "jwt sign failed");
                AuthError::Token(e)
            })
        })
        .await
    }

    async fn hash_off_executor(&self, password: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Task(e.to_string()))?
            .map_err(AuthError::from)
    }

    async fn bounded<T, F>(&self, step: &'static str, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(res) => res,
            Err(_) => {
                error!(
                    step,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "collaborator call timed out"
                );
                Err(AuthError::Timeout(step))
            }
        }
    }
}
