#[cfg(feature = "web")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure of a key-value storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Rejection of a submitted or imported problem
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UploadError {
    #[error("At least 2 answer options are required")]
    TooFewOptions,

    #[error("Correct answer must point at a filled-in option")]
    InvalidCorrectAnswer,

    #[error("Malformed problem file: {0}")]
    MalformedFile(String),
}

/// Account and session failures
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email and password cannot be empty")]
    MissingFields,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Email address is already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User database error: {0}")]
    Database(String),
}

/// Errors surfaced by the web layer
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Problem {0} not found")]
    ProblemNotFound(u64),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "web")]
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::ProblemNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::Database(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
