use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{StoreError, UserStore};
use super::repo_types::UserAccount;

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<Uuid, UserAccount>,
    email_index: HashMap<String, Uuid>,
}

/// In-process store; both maps sit behind one lock so the uniqueness check
/// and the insert are a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    tables: RwLock<Tables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count_by_email(&self, email: &str) -> usize {
        let tables = self.tables.read().await;
        tables.by_id.values().filter(|a| a.email == email).count()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops an account, as if it were deleted behind the workflow's back.
    pub async fn remove(&self, id: Uuid) -> Option<UserAccount> {
        let mut tables = self.tables.write().await;
        let account = tables.by_id.remove(&id)?;
        tables.email_index.remove(&account.email);
        Some(account)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .email_index
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.tables.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, account: UserAccount) -> Result<UserAccount, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.email_index.contains_key(&account.email) {
            return Err(StoreError::ConstraintViolation(format!(
                "email {} already exists",
                account.email
            )));
        }
        if tables.by_id.contains_key(&account.id) {
            return Err(StoreError::ConstraintViolation(format!(
                "id {} already exists",
                account.id
            )));
        }

        tables.email_index.insert(account.email.clone(), account.id);
        tables.by_id.insert(account.id, account.clone());
        Ok(account)
    }
}
