use std::convert::Infallible;
use std::path::Path as FsPath;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use futures::stream::{Stream, StreamExt};
use serde_json::{json, Value};
use todo_shared::{
    ChangeEvent, CreateTodoRequest, DeleteResponse, EmptyText, Todo, TodoResponse, UpdateTodoRequest,
    TODO_API_PATH, TODO_EVENTS_PATH,
};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::ApiError;
use crate::service::TodoService;

const CHANGE_EVENT_NAME: &str = "change";

#[derive(Clone)]
pub struct AppState {
    pub todos: TodoService,
}

impl AppState {
    pub fn new(todos: TodoService) -> Self {
        Self { todos }
    }
}

/// The JSON API and change stream, without static files.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(TODO_API_PATH, get(list_todos).post(create_todo))
        .route(TODO_EVENTS_PATH, get(todo_events))
        .route("/api/todo/:id", put(update_todo).delete(delete_todo))
        .with_state(state)
}

/// Full application: API plus the built frontend served from `static_dir`.
pub fn app(state: AppState, static_dir: &FsPath) -> Router {
    api_router(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.todos.list().await?))
}

async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    // Missing, non-string and unparseable `text` all read as no text.
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!(rejection = %rejection.body_text(), "create body rejected");
        ApiError::Validation(EmptyText.to_string())
    })?;
    let todo = state.todos.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(TodoResponse {
            success: true,
            todo,
        }),
    ))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    // A malformed id cannot name a row.
    let id = Uuid::parse_str(&raw_id).map_err(|_| ApiError::NotFound(raw_id.clone()))?;
    let Json(request) = body.map_err(invalid_body)?;
    let todo = state.todos.update(id, request).await?;
    Ok(Json(TodoResponse {
        success: true,
        todo,
    }))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    match Uuid::parse_str(&raw_id) {
        Ok(id) => state.todos.delete(id).await?,
        Err(_) => tracing::debug!(id = %raw_id, "delete of malformed id treated as no-op"),
    }
    Ok(Json(DeleteResponse { success: true }))
}

/// Relays store changes as server-sent `change` events.
async fn todo_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = BroadcastStream::new(state.todos.subscribe()).map(|item| {
        let change = match item {
            Ok(change) => Some(change),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "change subscriber lagged, sending resync");
                None
            }
        };
        Ok(change_event(change))
    });
    Sse::new(changes).keep_alive(KeepAlive::default())
}

fn change_event(change: Option<ChangeEvent>) -> Event {
    let data = change
        .and_then(|change| serde_json::to_string(&change).ok())
        .unwrap_or_else(|| r#"{"kind":"resync"}"#.to_string());
    Event::default().event(CHANGE_EVENT_NAME).data(data)
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(format!("invalid request body: {}", rejection.body_text()))
}
