//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the HTTP surface and the
//! core components, along with the mapping to the `{error: {code, message}}`
//! wire envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::error::Error as StdError;

type BoxedCause = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Boundary validation failure. Rejected before any collaborator is invoked;
    /// `issues` is the itemized list surfaced to the client.
    #[error("validation failed")]
    Validation { issues: Vec<String> },
    /// A normal, expected miss: no matching record, or a content handler
    /// signalled benign absence.
    #[error("{message}")]
    NotFound { message: String },
    /// Well-formed but unserviceable request.
    #[error("{message}")]
    InvalidRequest { message: String },
    #[error("rate limit exceeded")]
    RateLimited,
    /// Collaborator or contract failure. The cause is logged server-side and
    /// never leaked to the client.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        cause: Option<BoxedCause>,
    },
}

impl AppError {
    pub fn validation(issues: Vec<String>) -> Self {
        AppError::Validation { issues }
    }
    pub fn validation_one<S: Into<String>>(issue: S) -> Self {
        AppError::Validation { issues: vec![issue.into()] }
    }
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound { message: msg.into() }
    }
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        AppError::InvalidRequest { message: msg.into() }
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        AppError::Internal { message: msg.into(), cause: None }
    }
    pub fn internal_from<S, E>(msg: S, cause: E) -> Self
    where
        S: Into<String>,
        E: StdError + Send + Sync + 'static,
    {
        AppError::Internal { message: msg.into(), cause: Some(Box::new(cause)) }
    }

    /// Stable wire code for the error envelope.
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::InvalidRequest { .. } => "INVALID_REQUEST",
            AppError::RateLimited => "RATE_LIMIT_EXCEEDED",
            AppError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to echo to the client. Internal detail is replaced with a
    /// generic message unless TABULARIUM_DEBUG_ERRORS is set (a non-production
    /// escape hatch).
    pub fn client_message(&self) -> String {
        match self {
            AppError::Internal { message, .. } => {
                if debug_errors_enabled() {
                    message.clone()
                } else {
                    "internal server error".to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

fn debug_errors_enabled() -> bool {
    std::env::var("TABULARIUM_DEBUG_ERRORS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            let cause = self.source().map(|c| c.to_string());
            tracing::error!(code = self.code_str(), error = %self, cause = ?cause, "request failed");
        }
        let mut envelope = json!({
            "error": {
                "code": self.code_str(),
                "message": self.client_message(),
            }
        });
        if let AppError::Validation { issues } = &self {
            envelope["error"]["details"] = json!(issues);
        }
        (status, Json(envelope)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::internal_from("record store query failed", e)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::internal_from("search engine request failed", e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::internal_from("serialization failed", e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::internal_from("i/o failure", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::validation_one("bad limit").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("missing").http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::invalid("nope").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::RateLimited.http_status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::internal("boom").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn code_mapping() {
        assert_eq!(AppError::validation_one("x").code_str(), "VALIDATION_ERROR");
        assert_eq!(AppError::not_found("x").code_str(), "NOT_FOUND");
        assert_eq!(AppError::invalid("x").code_str(), "INVALID_REQUEST");
        assert_eq!(AppError::RateLimited.code_str(), "RATE_LIMIT_EXCEEDED");
        assert_eq!(AppError::internal("x").code_str(), "INTERNAL_ERROR");
    }

    #[test]
    fn internal_detail_not_leaked() {
        let err = AppError::internal("pool exhausted on shard 7");
        assert_eq!(err.client_message(), "internal server error");
        let nf = AppError::not_found("entity not found: x");
        assert_eq!(nf.client_message(), "entity not found: x");
    }
}
