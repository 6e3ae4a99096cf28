// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP error mapping.
//!
//! | Error | Status |
//! |-------|--------|
//! | missing or malformed caller identity | 401 |
//! | role or ownership violation | 403 |
//! | domain validation (`ClearanceError`) | 422 |
//! | unknown record or message | 404 |
//! | duplicate record | 409 |
//! | store failure | 500 |
//!
//! Every error body is `{ "error": <message>, "kind": <kind> }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::application::ClearanceServiceError;
use crate::domain::clearance::ClearanceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Validation { message: String, kind: &'static str },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::Validation { kind, .. } => kind,
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "AlreadyExists",
            Self::Internal(_) => "Internal",
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>, kind: &'static str) -> Self {
        Self::Validation {
            message: message.into(),
            kind,
        }
    }
}

impl From<ClearanceError> for ApiError {
    fn from(err: ClearanceError) -> Self {
        Self::Validation {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<ClearanceServiceError> for ApiError {
    fn from(err: ClearanceServiceError) -> Self {
        match err {
            ClearanceServiceError::Domain(e) => e.into(),
            ClearanceServiceError::NotFound(_) => Self::NotFound(err.to_string()),
            ClearanceServiceError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            ClearanceServiceError::Repository(ref e) => {
                error!("Repository failure: {}", e);
                Self::Internal("Internal storage error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            kind: self.kind(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
