//! View state and its transitions.
//!
//! [`Model::update`] never touches the browser. It returns [`Effect`]s that
//! the application shell turns into fetches, timers and subscription waits.

use todo_shared::{CreateTodoRequest, Todo, UpdateTodoRequest};
use uuid::Uuid;

use crate::error::ClientError;

/// How long an error banner stays up.
pub const ERROR_BANNER_MS: i32 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateIntent {
    /// Text edit submitted from the input field.
    Edit,
    /// Checkbox flip.
    Toggle,
}

#[derive(Debug, Clone)]
pub enum Msg {
    Mounted,
    TodosLoaded(Result<Vec<Todo>, ClientError>),
    SetDraft(String),
    KeyPressed(String),
    Submit,
    StartEdit(Uuid),
    CancelEdit,
    ToggleTodo(Uuid),
    DeleteTodo(Uuid),
    Created(Result<Todo, ClientError>),
    Updated(UpdateIntent, Result<Todo, ClientError>),
    Deleted(Uuid, Result<(), ClientError>),
    HoverStart(Uuid),
    HoverEnd(Uuid),
    DismissError(u64),
    RemoteChange,
    ChangeStreamClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchTodos,
    Create(CreateTodoRequest),
    Update {
        id: Uuid,
        request: UpdateTodoRequest,
        intent: UpdateIntent,
    },
    Delete(Uuid),
    DismissErrorAfter { ticket: u64, millis: i32 },
    /// Wait for the next change notification.
    AwaitChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub message: String,
    ticket: u64,
}

#[derive(Debug, Default)]
pub struct Model {
    todos: Vec<Todo>,
    draft_text: String,
    editing_id: Option<Uuid>,
    hovered_id: Option<Uuid>,
    filter_text: String,
    error: Option<Banner>,
    loading: bool,
    next_ticket: u64,
}

impl Model {
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    /// Todos whose text contains the filter, ignoring case.
    pub fn visible_todos(&self) -> impl Iterator<Item = &Todo> + '_ {
        self.todos
            .iter()
            .filter(move |todo| todo.matches_filter(&self.filter_text))
    }

    pub fn draft_text(&self) -> &str {
        &self.draft_text
    }

    pub fn editing_id(&self) -> Option<Uuid> {
        self.editing_id
    }

    pub fn hovered_id(&self) -> Option<Uuid> {
        self.hovered_id
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|banner| banner.message.as_str())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Mounted => vec![self.refresh(), Effect::AwaitChange],
            Msg::TodosLoaded(Ok(todos)) => {
                self.loading = false;
                self.todos = todos;
                if let Some(id) = self.editing_id {
                    if !self.contains(id) {
                        self.leave_edit_mode();
                    }
                }
                if self.hovered_id.is_some_and(|id| !self.contains(id)) {
                    self.hovered_id = None;
                }
                vec![]
            }
            Msg::TodosLoaded(Err(err)) => {
                self.loading = false;
                vec![self.show_error(format!("Failed to load todos: {err}"))]
            }
            Msg::SetDraft(text) => {
                if self.editing_id.is_none() {
                    self.filter_text = text.clone();
                }
                self.draft_text = text;
                vec![]
            }
            Msg::KeyPressed(key) => match key.as_str() {
                "Enter" => self.update(Msg::Submit),
                "Escape" if self.is_editing() => self.update(Msg::CancelEdit),
                _ => vec![],
            },
            Msg::Submit => self.submit(),
            Msg::StartEdit(id) => {
                if let Some(text) = self.find(id).map(|todo| todo.text.clone()) {
                    self.draft_text = text;
                    self.editing_id = Some(id);
                }
                vec![]
            }
            Msg::CancelEdit => {
                self.leave_edit_mode();
                vec![]
            }
            Msg::ToggleTodo(id) => match self.find(id) {
                Some(todo) => vec![Effect::Update {
                    id,
                    request: UpdateTodoRequest::completed(!todo.completed),
                    intent: UpdateIntent::Toggle,
                }],
                None => vec![],
            },
            Msg::DeleteTodo(id) => vec![Effect::Delete(id)],
            Msg::Created(Ok(todo)) => {
                self.draft_text.clear();
                self.filter_text.clear();
                if !self.contains(todo.id) {
                    self.todos.insert(0, todo);
                }
                vec![self.refresh()]
            }
            Msg::Created(Err(err)) => vec![self.show_error(mutation_message(&err, "add"))],
            Msg::Updated(intent, Ok(todo)) => {
                if intent == UpdateIntent::Edit && self.editing_id == Some(todo.id) {
                    self.leave_edit_mode();
                }
                self.replace(todo);
                vec![self.refresh()]
            }
            Msg::Updated(UpdateIntent::Edit, Err(err)) => {
                vec![self.show_error(mutation_message(&err, "update"))]
            }
            Msg::Updated(UpdateIntent::Toggle, Err(_)) => {
                vec![self.show_error("Failed to update todo".to_string())]
            }
            Msg::Deleted(id, Ok(())) => {
                self.todos.retain(|todo| todo.id != id);
                if self.editing_id == Some(id) {
                    self.leave_edit_mode();
                }
                if self.hovered_id == Some(id) {
                    self.hovered_id = None;
                }
                vec![self.refresh()]
            }
            Msg::Deleted(_, Err(_)) => {
                vec![
                    self.show_error("Failed to delete todo".to_string()),
                    self.refresh(),
                ]
            }
            Msg::HoverStart(id) => {
                self.hovered_id = Some(id);
                vec![]
            }
            Msg::HoverEnd(id) => {
                if self.hovered_id == Some(id) {
                    self.hovered_id = None;
                }
                vec![]
            }
            Msg::DismissError(ticket) => {
                if self.error.as_ref().is_some_and(|banner| banner.ticket == ticket) {
                    self.error = None;
                }
                vec![]
            }
            Msg::RemoteChange => vec![self.refresh(), Effect::AwaitChange],
            Msg::ChangeStreamClosed => vec![],
        }
    }

    fn submit(&mut self) -> Vec<Effect> {
        if self.draft_text.trim().is_empty() {
            return vec![];
        }
        let text = self.draft_text.trim().to_string();
        match self.editing_id {
            Some(id) => vec![Effect::Update {
                id,
                request: UpdateTodoRequest::text(text),
                intent: UpdateIntent::Edit,
            }],
            None => vec![Effect::Create(CreateTodoRequest {
                text,
                completed: None,
            })],
        }
    }

    fn refresh(&mut self) -> Effect {
        self.loading = true;
        Effect::FetchTodos
    }

    fn show_error(&mut self, message: String) -> Effect {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.error = Some(Banner { message, ticket });
        Effect::DismissErrorAfter {
            ticket,
            millis: ERROR_BANNER_MS,
        }
    }

    fn leave_edit_mode(&mut self) {
        self.editing_id = None;
        self.draft_text.clear();
        self.filter_text.clear();
    }

    fn find(&self, id: Uuid) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    fn contains(&self, id: Uuid) -> bool {
        self.find(id).is_some()
    }

    fn replace(&mut self, updated: Todo) {
        if let Some(slot) = self.todos.iter_mut().find(|todo| todo.id == updated.id) {
            *slot = updated;
        }
    }
}

/// Conflict and validation messages come from the server verbatim; other
/// failures get a generic line.
fn mutation_message(err: &ClientError, verb: &str) -> String {
    match err {
        ClientError::Conflict(message) | ClientError::Validation(message) => message.clone(),
        _ => format!("Failed to {verb} todo"),
    }
}
