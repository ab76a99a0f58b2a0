use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use super::repo_types::UserAccount;
use crate::config::JwtConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("expected a {expected} token, got {actual}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
    #[error("token lifetime puts expiry out of range")]
    LifetimeOutOfRange,
}

/// Signs and checks session tokens for accounts.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, account: &UserAccount, kind: TokenKind) -> Result<String, TokenError>;
    async fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError>;
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: minutes(cfg.ttl_minutes),
            refresh_ttl: minutes(cfg.refresh_ttl_minutes),
        }
    }
}

fn minutes(value: i64) -> Duration {
    let minutes = u64::try_from(value).unwrap_or(0);
    Duration::from_secs(minutes.saturating_mul(60))
}

impl JwtKeys {
    fn sign_with_kind(&self, account: &UserAccount, kind: TokenKind) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or(TokenError::LifetimeOutOfRange)?;
        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            role: account.role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %account.id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenIssuer for JwtKeys {
    async fn issue(&self, account: &UserAccount, kind: TokenKind) -> Result<String, TokenError> {
        self.sign_with_kind(account, kind)
    }

    async fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.decode_claims(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::{NewUserAccount, Role};

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    fn account() -> UserAccount {
        UserAccount::new(NewUserAccount {
            firstname: "Alan".into(),
            lastname: "Turing".into(),
            email: "alan@example.com".into(),
            password_hash: "$argon2id$v=19$secret-digest".into(),
            role: Role::NormalUser,
        })
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let account = account();
        let token = keys.issue(&account, TokenKind::Access).await.expect("sign access");
        assert!(!token.is_empty());

        let claims = keys.verify(&token, TokenKind::Access).await.expect("verify token");
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.email, "alan@example.com");
        assert_eq!(claims.role, Role::NormalUser);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn refresh_token_lives_longer_than_access() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let account = account();
        let access = keys.issue(&account, TokenKind::Access).await.unwrap();
        let refresh = keys.issue(&account, TokenKind::Refresh).await.unwrap();

        let access = keys.verify(&access, TokenKind::Access).await.unwrap();
        let refresh = keys.verify(&refresh, TokenKind::Refresh).await.unwrap();
        assert!(refresh.exp > access.exp);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_kind() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.issue(&account(), TokenKind::Access).await.unwrap();
        let err = keys.verify(&token, TokenKind::Refresh).await.unwrap_err();
        assert!(matches!(
            err,
            TokenError::WrongKind {
                expected: TokenKind::Refresh,
                actual: TokenKind::Access
            }
        ));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.issue(&account(), TokenKind::Access).await.unwrap();
        let err = bad_keys.verify(&token, TokenKind::Access).await.unwrap_err();
        assert!(matches!(err, TokenError::Jwt(_)));
    }

    #[tokio::test]
    async fn verify_rejects_other_secret() {
        let keys = make_keys("secret-a", "iss", "aud");
        let other = make_keys("secret-b", "iss", "aud");
        let token = keys.issue(&account(), TokenKind::Access).await.unwrap();
        assert!(other.verify(&token, TokenKind::Access).await.is_err());
    }

    #[tokio::test]
    async fn oversized_lifetime_is_an_error() {
        let keys = JwtKeys::from(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 1_000_000_000_000,
            refresh_ttl_minutes: i64::MAX,
        });
        let account = account();

        let access = keys.issue(&account, TokenKind::Access).await.unwrap_err();
        let refresh = keys.issue(&account, TokenKind::Refresh).await.unwrap_err();
        assert!(matches!(access, TokenError::LifetimeOutOfRange));
        assert!(matches!(refresh, TokenError::LifetimeOutOfRange));
    }

    #[tokio::test]
    async fn token_does_not_carry_password_hash() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let account = account();
        let token = keys.issue(&account, TokenKind::Access).await.unwrap();

        let claims = keys.verify(&token, TokenKind::Access).await.unwrap();
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains(&account.password_hash));
        assert!(!token.contains("argon2"));
    }
}
