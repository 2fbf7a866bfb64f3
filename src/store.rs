//! User store capability.
//!
//! Persistence is an external collaborator: the core only needs three
//! operations from it. [`InMemoryUserStore`] is the reference implementation
//! used by tests and examples; production deployments plug in their own.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// User store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend failure (connection loss, query error, ...).
    #[error("user store backend error: {0}")]
    Backend(String),
}

/// A user record as held by the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique user id.
    pub id: String,
    /// Email address (login identifier).
    pub email: String,
    /// Display name.
    pub name: String,
    /// Optional role name.
    pub role: Option<String>,
    /// Granted permissions.
    pub permissions: Vec<String>,
    /// PHC-formatted password hash.
    pub password_hash: String,
    /// Whether the email address has been verified.
    pub email_verified: bool,
    /// Whether the account is active.
    pub is_active: bool,
}

/// The projection of a user the core carries around and embeds in token
/// claims. Everything else about a user stays in the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user id.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Optional role name.
    pub role: Option<String>,
    /// Granted permissions.
    pub permissions: Vec<String>,
}

impl From<&UserRecord> for User {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            email: record.email.clone(),
            name: record.name.clone(),
            role: record.role.clone(),
            permissions: record.permissions.clone(),
        }
    }
}

/// User store capability required from the outside.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Persist changes to a user record.
    async fn update(&self, user: &UserRecord) -> Result<(), StoreError>;
}

/// In-memory user store for tests and examples.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user record, replacing any existing record with the same id.
    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn update(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}
