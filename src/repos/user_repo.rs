/*
 * Responsibility
 * - users コレクション向けの CRUD (in-memory)
 * - id 採番と insert を 1 つの lock の中で行い、同時リクエストでも id が重複しないようにする
 * - 永続化はしない (再起動で消える)
 */
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::repos::error::RepoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Storage seam for the users resource.
///
/// Ids are assigned by the store, start at 1, only ever increase, and are
/// never handed out again after a delete.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<UserRow>, RepoError>;

    async fn get(&self, id: u64) -> Result<Option<UserRow>, RepoError>;

    async fn insert(&self, name: &str, email: &str) -> Result<UserRow, RepoError>;

    // Returns `None` when no row has `id`.
    async fn update(&self, id: u64, name: &str, email: &str) -> Result<Option<UserRow>, RepoError>;

    // Returns `false` when no row has `id`.
    async fn delete(&self, id: u64) -> Result<bool, RepoError>;
}

#[derive(Debug)]
struct Inner {
    next_id: u64,
    users: BTreeMap<u64, UserRow>,
}

#[derive(Debug)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                users: BTreeMap::new(),
            }),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<UserRow>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Option<UserRow>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn insert(&self, name: &str, email: &str) -> Result<UserRow, RepoError> {
        let mut inner = self.inner.write().await;

        let id = inner.next_id;
        inner.next_id = id.checked_add(1).ok_or(RepoError::IdSpaceExhausted)?;

        let row = UserRow {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
        };
        inner.users.insert(id, row.clone());

        Ok(row)
    }

    async fn update(&self, id: u64, name: &str, email: &str) -> Result<Option<UserRow>, RepoError> {
        let mut inner = self.inner.write().await;

        let Some(row) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        row.name = name.to_owned();
        row.email = email.to_owned();

        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: u64) -> Result<bool, RepoError> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.remove(&id).is_some())
    }
}
