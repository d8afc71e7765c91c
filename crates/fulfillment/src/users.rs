//! User existence checks.
//!
//! Accounts and credentials are managed elsewhere; the engine only needs to
//! know whether a user id refers to a real account.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use tokio::sync::RwLock;

use crate::Result;

/// Trait for looking up whether users exist.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns true if the user exists.
    async fn exists(&self, user_id: UserId) -> Result<bool>;
}

/// In-memory user directory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashSet<UserId>>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns its id.
    pub async fn register(&self, user_id: UserId) -> UserId {
        self.users.write().await.insert(user_id);
        user_id
    }

    /// Registers a fresh random user.
    pub async fn register_new(&self) -> UserId {
        self.register(UserId::new()).await
    }

    /// Removes a user.
    pub async fn remove(&self, user_id: UserId) -> bool {
        self.users.write().await.remove(&user_id)
    }

    /// Returns the number of registered users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, user_id: UserId) -> Result<bool> {
        Ok(self.users.read().await.contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let directory = InMemoryUserDirectory::new();
        let user = directory.register_new().await;

        assert!(directory.exists(user).await.unwrap());
        assert!(!directory.exists(UserId::new()).await.unwrap());
        assert_eq!(directory.user_count().await, 1);

        assert!(directory.remove(user).await);
        assert!(!directory.exists(user).await.unwrap());
    }
}
