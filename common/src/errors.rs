//! Application error types.
//!
//! Every failure that can reach an HTTP client is an [`AppError`]; its
//! [`IntoResponse`] impl turns it into a status code and an [`ErrorResponse`]
//! body. Raw driver messages never leave the process: they are logged where the
//! error is classified and only the [`QueryErrorKind`] travels on.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::ErrorResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, blank or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Table preview requested for a name outside the allow-list.
    #[error("Table {0} is not available for preview")]
    TableNotAllowed(String),

    /// Statement or document operation rejected by the database.
    #[error("{kind}")]
    QueryFailed { kind: QueryErrorKind },

    /// Table preview failed at the database layer.
    #[error("Failed to fetch table {table}")]
    TablePreview { table: String, kind: QueryErrorKind },

    /// NoSQL endpoint called without a configured document store.
    #[error("Document store is not configured")]
    DocumentStoreUnavailable,

    /// Invalid startup configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::TableNotAllowed(_) => StatusCode::BAD_REQUEST,
            AppError::QueryFailed { .. } | AppError::TablePreview { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::DocumentStoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::TableNotAllowed(_) => "TABLE_NOT_ALLOWED",
            AppError::QueryFailed { kind } | AppError::TablePreview { kind, .. } => kind.code(),
            AppError::DocumentStoreUnavailable => "DOCUMENT_STORE_UNAVAILABLE",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), "{}", self);
        }
        let body = ErrorResponse::new(self.to_string(), self.code());
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("{} is invalid", field),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

/// User-facing category of a database failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    /// The statement could not be parsed.
    BadSyntax,
    /// The credentials lack the required privilege.
    PermissionDenied,
    /// A referenced table, column or collection does not exist.
    UndefinedObject,
    /// The database could not be reached.
    Unreachable,
    /// Anything else.
    Unknown,
}

impl QueryErrorKind {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorKind::BadSyntax => "BAD_SYNTAX",
            QueryErrorKind::PermissionDenied => "PERMISSION_DENIED",
            QueryErrorKind::UndefinedObject => "UNDEFINED_OBJECT",
            QueryErrorKind::Unreachable => "UNREACHABLE",
            QueryErrorKind::Unknown => "QUERY_FAILED",
        }
    }

    /// Message shown to the client.
    pub fn message(&self) -> &'static str {
        match self {
            QueryErrorKind::BadSyntax => "Query has a syntax error",
            QueryErrorKind::PermissionDenied => "Permission denied for this query",
            QueryErrorKind::UndefinedObject => "Query references a table or column that does not exist",
            QueryErrorKind::Unreachable => "Database is unreachable",
            QueryErrorKind::Unknown => "Query failed",
        }
    }

    /// Classifies a driver failure from its SQLSTATE (if any) and message.
    pub fn classify(sqlstate: Option<&str>, message: &str) -> Self {
        let msg = message.to_ascii_lowercase();
        let state = sqlstate.unwrap_or_default();

        if matches!(state, "28000" | "28P01" | "42501")
            || msg.contains("denied")
            || msg.contains("permission")
            || msg.contains("not authorized")
        {
            return QueryErrorKind::PermissionDenied;
        }

        if matches!(state, "42S02" | "42S22" | "42P01" | "42703" | "42883" | "3F000" | "3D000")
            || msg.contains("no such table")
            || msg.contains("no such column")
            || msg.contains("doesn't exist")
            || msg.contains("does not exist")
            || msg.contains("unknown column")
            || msg.contains("unknown table")
        {
            return QueryErrorKind::UndefinedObject;
        }

        if state.starts_with("42") || msg.contains("syntax error") {
            return QueryErrorKind::BadSyntax;
        }

        if state.starts_with("08") || msg.contains("connection refused") {
            return QueryErrorKind::Unreachable;
        }

        QueryErrorKind::Unknown
    }

    /// Classifies a sqlx error.
    pub fn from_sqlx(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => Self::classify(db.code().as_deref(), db.message()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => QueryErrorKind::Unreachable,
            other => Self::classify(None, &other.to_string()),
        }
    }
}

impl std::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}
