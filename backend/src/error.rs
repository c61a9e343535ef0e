use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use todo_shared::ErrorBody;

use crate::store::StoreError;

const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Failure of a todo API call, one variant per response status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("todo {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Store(err) => {
                tracing::error!(error = %err, "todo store operation failed");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => {
                tracing::debug!(%status, error = %other, "rejected todo request");
                other.to_string()
            }
        };
        (status, Json(ErrorBody::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_hide_their_cause() {
        let err = ApiError::from(StoreError::Decode("column \"secret\" missing".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(ApiError::Validation("text required".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }
}
