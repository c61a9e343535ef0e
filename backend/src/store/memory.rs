use async_trait::async_trait;
use chrono::Utc;
use todo_shared::{ChangeEvent, ChangeKind};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{
    ChangeFeed, NewTodoRow, StoreError, TodoPatch, TodoRow, TodoStore, CHECK_VIOLATION,
};

/// In-process store with the same constraints as the `todos` table.
///
/// Each write holds the lock across its constraint check, so uniqueness is
/// atomic with the write just like the database's unique index.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<TodoRow>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn check_text(text: &str) -> Result<(), StoreError> {
    if text.trim().is_empty() {
        return Err(StoreError::Rejected {
            status: 400,
            code: Some(CHECK_VIOLATION.to_string()),
            message: "new row violates check constraint \"todos_todo_not_blank\"".to_string(),
        });
    }
    Ok(())
}

fn check_unique(rows: &[TodoRow], text: &str, except: Option<Uuid>) -> Result<(), StoreError> {
    let key = text.to_lowercase();
    let taken = rows
        .iter()
        .any(|row| Some(row.id) != except && row.todo.to_lowercase() == key);
    if taken {
        return Err(StoreError::UniqueViolation(format!(
            "Key (lower(todo))=({key}) already exists."
        )));
    }
    Ok(())
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn list(&self) -> Result<Vec<TodoRow>, StoreError> {
        let rows = self.rows.read().await;
        // Newest insert first among equal timestamps.
        let mut listed: Vec<TodoRow> = rows.iter().rev().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<TodoRow>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn insert(&self, row: NewTodoRow) -> Result<TodoRow, StoreError> {
        check_text(&row.todo)?;
        let mut rows = self.rows.write().await;
        check_unique(&rows, &row.todo, None)?;

        let created = TodoRow {
            id: Uuid::new_v4(),
            todo: row.todo,
            is_completed: row.is_completed,
            created_at: Utc::now(),
        };
        rows.push(created.clone());
        drop(rows);

        self.feed.publish(ChangeKind::Insert, created.id);
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: TodoPatch) -> Result<Option<TodoRow>, StoreError> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|row| row.id == id) else {
            return Ok(None);
        };

        if let Some(text) = &patch.todo {
            check_text(text)?;
            check_unique(&rows, text, Some(id))?;
        }

        let row = &mut rows[index];
        if let Some(text) = patch.todo {
            row.todo = text;
        }
        if let Some(completed) = patch.is_completed {
            row.is_completed = completed;
        }
        let updated = row.clone();
        drop(rows);

        self.feed.publish(ChangeKind::Update, id);
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        let removed = rows.len() != before;
        drop(rows);

        if removed {
            self.feed.publish(ChangeKind::Delete, id);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
