use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::repo::{User, UserStore};
use crate::store::{StoreError, StoreResult};

/// In-process [`UserStore`] enforcing the same uniqueness rules as the
/// `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &BTreeMap<String, User>, email: &str, except: &str) -> bool {
    users
        .values()
        .any(|u| u.username != except && u.email_address == email)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        if email_taken(&users, &user.email_address, &user.username) {
            return Err(StoreError::Conflict(format!(
                "email address '{}' is already registered",
                user.email_address
            )));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.username) {
            return Ok(false);
        }
        if email_taken(&users, &user.email_address, &user.username) {
            return Err(StoreError::Conflict(format!(
                "email address '{}' is already registered",
                user.email_address
            )));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(true)
    }

    async fn delete(&self, username: &str) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(username).is_some())
    }
}
