use todo_shared::ErrorBody;

/// Why a call to the todo API failed, as far as the view cares.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("server error ({0})")]
    Server(u16),
    #[error("network error: {0}")]
    Network(String),
}

impl ClientError {
    /// Classifies a non-success response by status, keeping the server's
    /// message for the statuses that carry a user-facing one.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|body| body.error)
            .unwrap_or_else(|_| body.trim().to_string());
        match status {
            400 | 422 => ClientError::Validation(message),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            other => ClientError::Server(other),
        }
    }
}
