use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Role, UserAccount};

const REDACTED: &str = "<redacted>";

/// Request body for user registration.
#[derive(Clone, Deserialize)]
pub struct RegisterRequest {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Request body for login.
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Outcome of a successful register, authenticate or refresh call.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub user_id: Uuid,
    pub refresh_token: String,
}

impl AuthResult {
    /// Shapes the result for a transport; `userId` is optional by config.
    pub fn into_response(self, include_user_id: bool) -> AuthResponse {
        AuthResponse {
            token: self.token,
            user_id: include_user_id.then_some(self.user_id),
            refresh_token: Some(self.refresh_token),
        }
    }
}

/// Payload returned after login, register or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Public part of the account returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub role: Role,
}

impl From<&UserAccount> for PublicUser {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            firstname: account.firstname.clone(),
            lastname: account.lastname.clone(),
            role: account.role,
        }
    }
}
