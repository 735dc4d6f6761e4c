//! Database error types.
//!
//! This module provides abstracted error types for database operations.
//! It uses miette for fancy diagnostic output and thiserror for derive macros.
//! The error types are storage-backend agnostic: both SQLite and PostgreSQL
//! failures are folded into the same variants.

use miette::Diagnostic;
use thiserror::Error;

/// Database operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Entity not found: {entity_type} with id '{id}'")]
    #[diagnostic(code(mclaren::db::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("Validation error: {message}")]
    #[diagnostic(code(mclaren::db::validation_error))]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("Database error: {message}")]
    #[diagnostic(code(mclaren::db::database_error))]
    Database { message: String },

    #[error("Migration error: {message}")]
    #[diagnostic(code(mclaren::db::migration_error))]
    Migration { message: String },

    #[error("Connection error: {message}")]
    #[diagnostic(code(mclaren::db::connection_error))]
    Connection { message: String },
}

impl DbError {
    /// Not-found error for an entity kind and id.
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Validation error attached to a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        DbError::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity_type: "row".to_string(),
                id: String::new(),
            },
            sqlx::Error::Database(ref db_err)
                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation() =>
            {
                DbError::Validation {
                    field: None,
                    message: db_err.message().to_string(),
                }
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DbError::Connection {
                message: e.to_string(),
            },
            sqlx::Error::Migrate(ref m) => DbError::Migration {
                message: m.to_string(),
            },
            other => DbError::Database {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
