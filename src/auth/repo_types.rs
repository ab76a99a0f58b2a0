use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::StoreError;

/// Role granted to an account.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    NormalUser,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::NormalUser => "normal_user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal_user" => Ok(Role::NormalUser),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

/// Fields needed to create an account; the hash must already be computed.
#[derive(Debug, Clone)]
pub struct NewUserAccount {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// User account as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl UserAccount {
    pub fn new(fields: NewUserAccount) -> Self {
        let NewUserAccount {
            firstname,
            lastname,
            email,
            password_hash,
            role,
        } = fields;
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            firstname,
            lastname,
            email,
            password_hash,
            role,
            // Postgres keeps microseconds; truncate so stored and returned values agree.
            created_at: now.replace_nanosecond(now.microsecond() * 1_000).unwrap_or(now),
        }
    }
}

/// Row shape of the `users` table.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|e| {
            StoreError::DataCorruption(format!("user {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            firstname: row.firstname,
            lastname: row.lastname,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_fields() -> NewUserAccount {
        NewUserAccount {
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            role: Role::default(),
        }
    }

    #[test]
    fn new_account_defaults_to_normal_user_with_fresh_id() {
        let a = UserAccount::new(new_fields());
        let b = UserAccount::new(new_fields());
        assert_eq!(a.role, Role::NormalUser);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serialization_hides_password_hash() {
        let account = UserAccount::new(new_fields());
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("ada@example.com"));
        assert!(json.contains("normal_user"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn row_with_unknown_role_is_data_corruption() {
        let row = UserRow {
            id: Uuid::new_v4(),
            firstname: "x".into(),
            lastname: "y".into(),
            email: "x@y.z".into(),
            password_hash: "h".into(),
            role: "superuser".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let err = UserAccount::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(_)));
    }

    #[test]
    fn role_text_roundtrips() {
        for role in [Role::NormalUser, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }
}
