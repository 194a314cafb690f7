use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Failures raised by an attendance store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store operation timed out")]
    Timeout,

    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A uniqueness constraint rejected the write (checkin id or open session).
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// MySQL reports every integrity constraint violation as SQLSTATE 23000.
    pub fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Duplicate(db_err.message().to_string());
            }
        }
        StoreError::Unavailable(e)
    }
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;

#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("attendance store unavailable, retry later")]
    TransientStoreFailure(#[source] StoreError),
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(detail) => AttendanceError::Conflict(detail),
            other => AttendanceError::TransientStoreFailure(other),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
            AttendanceError::TransientStoreFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}
