// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a session token was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,
}

/// Failures of the session gate in front of every file operation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("user not found")]
    UserNotFound,
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("User already exists")]
    DuplicateUsername,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("File not found or not owned by the current user")]
    FileNotFoundOrForbidden,

    #[error("File record exists but stored bytes are missing: {0}")]
    StorageIntegrityFault(String),

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            // Not-owned and missing look the same from outside
            AppError::FileNotFoundOrForbidden | AppError::StorageIntegrityFault(_) => {
                StatusCode::NOT_FOUND
            },
            AppError::DuplicateUsername => StatusCode::CONFLICT,
            AppError::InvalidFilename(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Io(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::Unauthenticated) => "AUTH_001",
            AppError::Auth(AuthError::InvalidToken(_)) => "AUTH_002",
            AppError::Auth(AuthError::UserNotFound) => "AUTH_003",
            AppError::InvalidCredentials => "AUTH_004",
            AppError::DuplicateUsername => "USER_001",
            AppError::FileNotFoundOrForbidden => "FILE_001",
            AppError::StorageIntegrityFault(_) => "FILE_002",
            AppError::InvalidFilename(_) => "FILE_003",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::PayloadTooLarge(_) => "VAL_002",
            AppError::Io(_) => "IO_001",
            AppError::Database(_) => "DB_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(AuthError::Unauthenticated) => "Not authenticated".to_string(),
            AppError::Auth(_) | AppError::InvalidCredentials => {
                "Authentication failed".to_string()
            },
            AppError::DuplicateUsername => "User already exists".to_string(),
            AppError::FileNotFoundOrForbidden | AppError::StorageIntegrityFault(_) => {
                "File not found".to_string()
            },
            AppError::InvalidFilename(_) => "Invalid filename".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::PayloadTooLarge(_) => "Upload too large".to_string(),
            AppError::Io(_) | AppError::Database(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        }

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {e}"))
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}
