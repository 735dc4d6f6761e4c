//! API error type and its HTTP mapping.
//!
//! Every error that reaches the HTTP boundary is an [`ApiError`] and renders
//! as an [`ErrorResponse`] body. Server errors never put backend detail in the
//! body; it travels in an [`ErrorDetail`] response extension that the
//! top-level error middleware logs (and shows in development).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::DbError;

#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("{entity_type} '{id}' not found")]
    #[diagnostic(code(mclaren::api::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("{message}")]
    #[diagnostic(code(mclaren::api::validation_error))]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("No route matches '{path}'")]
    #[diagnostic(code(mclaren::api::route_not_found))]
    Routing { path: String },

    #[error("API version '{version}' is not supported (supported: {supported})")]
    #[diagnostic(code(mclaren::api::unsupported_api_version))]
    UnsupportedVersion { version: String, supported: String },

    #[error("Access to '{path}' is not permitted")]
    #[diagnostic(code(mclaren::api::forbidden))]
    Forbidden { path: String },

    #[error("None of the accepted media types ({accept}) can be produced; responses are application/json")]
    #[diagnostic(code(mclaren::api::not_acceptable))]
    NotAcceptable { accept: String },

    #[error("An unexpected error occurred")]
    #[diagnostic(code(mclaren::api::internal_error))]
    Internal { detail: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Routing { .. } => StatusCode::NOT_FOUND,
            ApiError::UnsupportedVersion { .. } => StatusCode::NOT_FOUND,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "not_found",
            ApiError::Validation { .. } => "validation_error",
            ApiError::Routing { .. } => "route_not_found",
            ApiError::UnsupportedVersion { .. } => "unsupported_api_version",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::NotAcceptable { .. } => "not_acceptable",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    #[schema(example = "Driver '42' not found")]
    pub error: String,
    /// Stable error code
    #[schema(example = "not_found")]
    pub code: String,
    /// Offending field, for validation errors
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[schema(example = "car_id")]
    pub field: Option<String>,
    /// Diagnostic detail (development only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(e: &ApiError) -> Self {
        let field = match e {
            ApiError::Validation { field, .. } => field.clone(),
            _ => None,
        };
        Self {
            error: e.to_string(),
            code: e.code().to_string(),
            field,
            detail: None,
        }
    }
}

/// Internal failure detail attached to a 500 response for the error middleware.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        let mut response = (self.status(), Json(body)).into_response();
        if let ApiError::Internal { detail } = self {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { entity_type, id } => ApiError::NotFound { entity_type, id },
            DbError::Validation { field, message } => ApiError::Validation { field, message },
            other => ApiError::Internal {
                detail: other.to_string(),
            },
        }
    }
}
