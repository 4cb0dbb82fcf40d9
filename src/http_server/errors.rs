//! HTTP API errors
//!
//! Every failure is answered with the response envelope:
//! `{"error": "...", "code": "...", "result": null}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::observability::{Event, Logger};
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request body is not UTF-8
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Query string value could not be parsed
    #[error("invalid query parameter {name:?}: {value:?}")]
    InvalidQuery { name: &'static str, value: String },

    /// Blocking task panicked or was cancelled
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Store(e) => match e {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::Encoding(_)
                | StoreError::InvalidToken(_)
                | StoreError::InvalidCollection(_) => StatusCode::BAD_REQUEST,
                StoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidBody(_) | ApiError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Store(e) => e.code(),
            ApiError::InvalidBody(_) => "DOCSTORE_HTTP_INVALID_BODY",
            ApiError::InvalidQuery { .. } => "DOCSTORE_HTTP_INVALID_QUERY",
            ApiError::Internal(_) => "DOCSTORE_HTTP_INTERNAL",
        }
    }
}

/// Response body shared by successes and failures
#[derive(Debug, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub result: Value,
}

impl Envelope {
    pub fn ok(result: Value) -> Self {
        Self {
            error: None,
            code: None,
            result,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let status_str = status.as_u16().to_string();
        let fields = [
            ("code", self.code()),
            ("error", message.as_str()),
            ("status", status_str.as_str()),
        ];
        if status.is_server_error() {
            Logger::error(Event::RequestFailed.as_str(), &fields);
        } else {
            Logger::trace(Event::RequestFailed.as_str(), &fields);
        }

        let body = Envelope {
            error: Some(message),
            code: Some(self.code()),
            result: Value::Null,
        };
        (status, Json(body)).into_response()
    }
}
