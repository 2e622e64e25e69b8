// src/error.rs
use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Why a draft was rejected. Paired with the offending field in
/// [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    Empty,
    TooShort { min: usize },
    TooLong { max: usize },
    InvalidCharacters,
    EndDateInPast,
    DurationTooShort,
    DurationTooLong,
    TooFewOptions { min: usize },
    TooManyOptions { max: usize },
    DuplicateOption,
    NonZeroVotes,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Empty => write!(f, "cannot be empty"),
            Reason::TooShort { min } => write!(f, "must be at least {min} characters"),
            Reason::TooLong { max } => write!(f, "cannot exceed {max} characters"),
            Reason::InvalidCharacters => write!(f, "contains invalid characters"),
            Reason::EndDateInPast => write!(f, "must be in the future"),
            Reason::DurationTooShort => write!(f, "must be at least 1 hour from now"),
            Reason::DurationTooLong => write!(f, "cannot be more than 30 days from now"),
            Reason::TooFewOptions { min } => write!(f, "must contain at least {min} entries"),
            Reason::TooManyOptions { max } => write!(f, "cannot contain more than {max} entries"),
            Reason::DuplicateOption => write!(f, "duplicates an earlier option (case-insensitive)"),
            Reason::NonZeroVotes => write!(f, "must be 0 for a new option"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: Reason,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: Reason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}

/// Failures surfaced by a [`crate::store::PollStore`] backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The `(poll, voter)` uniqueness guard rejected the insert.
    #[error("a vote by this identity already exists for the poll")]
    DuplicateVote,

    /// The option to increment does not exist under the given poll.
    #[error("option does not belong to the poll")]
    UnknownOption,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Poll not found")]
    NotFound,

    #[error("Poll has ended")]
    PollClosed,

    #[error("Option does not belong to this poll")]
    InvalidOption,

    #[error("Already voted in this poll")]
    AlreadyVoted,

    #[error("Internal failure: {0}")]
    Internal(#[source] StoreError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error("Poll not found")]
    NotFound,

    #[error("Invalid request format")]
    InvalidRequest(String),

    #[error("Invalid ID")]
    InvalidId,

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Internal error: {0}")]
    Internal(#[from] StoreError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidRequest(_) | AppError::InvalidId => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Vote(err) => match err {
                VoteError::NotFound => StatusCode::NOT_FOUND,
                VoteError::PollClosed | VoteError::AlreadyVoted => StatusCode::CONFLICT,
                VoteError::InvalidOption => StatusCode::BAD_REQUEST,
                VoteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::Validation(err) => json!({
                "status": "error",
                "error": "Validation failed",
                "field": err.field,
                "details": err.to_string(),
            }),
            AppError::InvalidRequest(details) => json!({
                "status": "error",
                "error": "Invalid request format",
                "details": details,
            }),
            AppError::Internal(err) => {
                error!("Request failed with storage error: {err}");
                json!({ "status": "error", "error": "Internal server error" })
            }
            // Already logged by the ledger.
            AppError::Vote(VoteError::Internal(_)) => {
                json!({ "status": "error", "error": "Internal server error" })
            }
            other => json!({ "status": "error", "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::InvalidId
    }
}
