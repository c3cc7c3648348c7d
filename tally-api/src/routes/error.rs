use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use tally_core::domain::{ImportError, StoreError, TimerError};

use crate::repositories::RepositoryError;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TimerAlreadyRunning,
    TimerNotRunning,
    ImportAborted,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<ErrorCode>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseError(ref e) => {
                tracing::error!("Database error: {:?}", e);
                Self::internal(err.to_string())
            }
            RepositoryError::NotFound(_) => Self::not_found(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::not_found(err.to_string()),
            StoreError::Backend(ref e) => {
                tracing::error!("Store backend error: {}", e);
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<TimerError> for ApiError {
    fn from(err: TimerError) -> Self {
        match err {
            TimerError::AlreadyRunning => {
                Self::conflict(err.to_string()).with_code(ErrorCode::TimerAlreadyRunning)
            }
            TimerError::NotRunning => {
                Self::not_found(err.to_string()).with_code(ErrorCode::TimerNotRunning)
            }
            TimerError::StoreRead(ref e) | TimerError::StoreWrite(ref e) => {
                tracing::error!("Timer store error: {}", e);
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::TooFewRows
            | ImportError::MissingTimeColumns
            | ImportError::InvalidRow { .. } => Self::bad_request(err.to_string()),
            ImportError::Batch { ref source, .. } => {
                tracing::error!("Import batch failed: {}", source);
                Self::unprocessable(err.to_string()).with_code(ErrorCode::ImportAborted)
            }
        }
    }
}
