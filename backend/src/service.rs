//! Todo operations in API terms.
//!
//! Validates input, converts between API and storage naming and turns store
//! failures into [`ApiError`]s. Uniqueness is left to the store: both create
//! and update are single writes and a duplicate surfaces as the write's own
//! [`StoreError::UniqueViolation`].

use std::sync::Arc;

use todo_shared::{normalize_text, ChangeEvent, CreateTodoRequest, Todo, UpdateTodoRequest};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{NewTodoRow, StoreError, TodoPatch, TodoRow, TodoStore};

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            id: row.id,
            text: row.todo,
            completed: row.is_completed,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Todo>, ApiError> {
        let rows = self.store.list().await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    pub async fn create(&self, request: CreateTodoRequest) -> Result<Todo, ApiError> {
        let text = normalize_text(&request.text).map_err(|err| ApiError::Validation(err.to_string()))?;
        let row = NewTodoRow {
            todo: text.clone(),
            is_completed: request.completed.unwrap_or(false),
        };

        let created = self
            .store
            .insert(row)
            .await
            .map_err(|err| conflict_or_store(err, &text))?;
        tracing::info!(id = %created.id, "created todo");
        Ok(created.into())
    }

    pub async fn update(&self, id: Uuid, request: UpdateTodoRequest) -> Result<Todo, ApiError> {
        let text = request
            .text
            .as_deref()
            .map(normalize_text)
            .transpose()
            .map_err(|err| ApiError::Validation(err.to_string()))?;
        let patch = TodoPatch {
            todo: text.clone(),
            is_completed: request.completed,
        };

        let row = if patch.is_empty() {
            self.store.get(id).await?
        } else {
            self.store.update(id, patch).await.map_err(|err| match &text {
                Some(text) => conflict_or_store(err, text),
                None => ApiError::Store(err),
            })?
        };

        let row = row.ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        tracing::info!(%id, "updated todo");
        Ok(row.into())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.store.delete(id).await?;
        tracing::info!(%id, "deleted todo");
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.store.subscribe()
    }
}

fn conflict_or_store(err: StoreError, text: &str) -> ApiError {
    match err {
        StoreError::UniqueViolation(detail) => {
            tracing::debug!(%detail, "duplicate todo text");
            ApiError::Conflict(format!("A todo named \"{text}\" already exists"))
        }
        other => ApiError::Store(other),
    }
}
