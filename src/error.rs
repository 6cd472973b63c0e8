//! Error types shared across the data, auth and HTTP layers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::vendors::FieldErrors;

/// Failures talking to a data service backend.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data service unreachable: {0}")]
    Unavailable(String),

    #[error("data service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("record not found")]
    NotFound,

    #[error("malformed data service response: {0}")]
    Decode(String),

    #[error("embedded store error: {0}")]
    Storage(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataError::Decode(err.to_string())
        } else {
            DataError::Unavailable(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("auth configuration error: {0}")]
    Configuration(String),
}

/// Error surfaced by the JSON API.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub fields: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
        }
    }

    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Validation failed".to_string(),
            fields: Some(fields),
        }
    }

    /// Maps a data failure to a status while keeping the caller's generic message.
    pub fn from_data(err: &DataError, message: &str) -> Self {
        let status = match err {
            DataError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.fields {
            Some(fields) => json!({ "error": self.message, "fields": fields }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}
