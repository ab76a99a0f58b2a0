pub mod authenticator;
pub mod blocking;
pub mod claims;
pub mod dto;
pub mod errors;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use authenticator::{Authenticator, StoreAuthenticator};
pub use blocking::BlockingAuthWorkflow;
pub use claims::{Claims, TokenKind};
pub use dto::{AuthResponse, AuthResult, LoginRequest, PublicUser, RegisterRequest};
pub use errors::AuthError;
pub use jwt::{JwtKeys, TokenError, TokenIssuer};
pub use memory::InMemoryUserStore;
pub use password::{Argon2Hasher, HashError, PasswordHasher};
pub use repo::{PgUserStore, StoreError, UserStore};
pub use repo_types::{NewUserAccount, Role, UserAccount};
pub use services::AuthWorkflow;
