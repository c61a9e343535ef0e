//! Data access for the `todos` table.
//!
//! Rows use the storage schema's snake_case naming. The service layer turns
//! them into API [`Todo`](todo_shared::Todo)s.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_shared::{ChangeEvent, ChangeKind};
use tokio::sync::broadcast;
use uuid::Uuid;

mod memory;
mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for `check_violation`.
pub const CHECK_VIOLATION: &str = "23514";

const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoRow {
    pub id: Uuid,
    pub todo: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTodoRow {
    pub todo: String,
    pub is_completed: bool,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.todo.is_none() && self.is_completed.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode store response: {0}")]
    Decode(String),
    #[error("store rejected request with status {status}: {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

#[async_trait]
pub trait TodoStore: Send + Sync + 'static {
    /// All rows, newest first.
    async fn list(&self) -> Result<Vec<TodoRow>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<TodoRow>, StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] when another row already
    /// holds the same text, ignoring case.
    async fn insert(&self, row: NewTodoRow) -> Result<TodoRow, StoreError>;

    /// Applies `patch` in one write. `Ok(None)` means no row has `id`.
    async fn update(&self, id: Uuid, patch: TodoPatch) -> Result<Option<TodoRow>, StoreError>;

    /// Deleting a missing row is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Change events for every committed write made through this store.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Fan-out of committed writes to any number of listeners.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, kind: ChangeKind, id: Uuid) {
        // No receivers is the common case between page loads.
        let receivers = self.tx.send(ChangeEvent { kind, id }).unwrap_or(0);
        tracing::debug!(?kind, %id, receivers, "published todo change");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
