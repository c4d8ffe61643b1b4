use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Per-field validation messages, keyed by the offending field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("{service} request failed: {reason}")]
    Upstream {
        service: &'static str,
        reason: String,
    },
}

impl AppError {
    pub fn upstream(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            reason: reason.into(),
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

/// Bodies that are not valid JSON for the target type are reported like any
/// other validation failure, under `non_field_errors`.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid_field("non_field_errors", rejection.body_text())
    }
}

/// True when `err` is a UNIQUE constraint violation reported by the database.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Other(_) => {
                error!("internal error: {self:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication required" })),
            )
                .into_response(),
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": errors.0 })),
            )
                .into_response(),
            AppError::Upstream { service, reason } => {
                error!(service, "upstream failure: {reason}");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": format!("failed to fetch {service} data") })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_pool, run_migrations};
    use tempfile::TempDir;

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let root = TempDir::new().expect("temp dir");
        let url = format!("sqlite://{}", root.path().join("errors.sqlite").display());
        let db = init_pool(&url).await.expect("pool");
        run_migrations(&db).await.expect("migrations");

        let insert = |uuid: &'static str| {
            sqlx::query(
                "INSERT INTO users (uuid, username, email, password_hash, created_at) \
                 VALUES (?, 'dawit', ?, 'x', '2030-01-01T00:00:00Z')",
            )
            .bind(uuid)
            .bind(format!("{uuid}@example.com"))
            .execute(&db)
        };
        insert("first").await.expect("first insert");
        let err = insert("second").await.unwrap_err();
        assert!(is_unique_violation(&err));

        let missing = sqlx::query("SELECT * FROM no_such_table")
            .execute(&db)
            .await
            .unwrap_err();
        assert!(!is_unique_violation(&missing));
    }
}
