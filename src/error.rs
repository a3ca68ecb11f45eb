//! Error types for the gateway

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for setup operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors raised while loading configuration and stores
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// wire-level envelope: { success, message, error: { code, message } }
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub error: ErrorBody,
}

/// Errors that surface to API callers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded. Retry after {retry_after} seconds.")]
    RateLimited {
        limit: u32,
        retry_after: u64,
        reset_at: i64,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::RateLimited { .. } => "Rate limit exceeded",
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope {
            success: false,
            message: self.summary().to_string(),
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        let mut resp = (self.status(), Json(envelope)).into_response();

        // rejected requests still carry the quota headers plus a retry hint
        if let ApiError::RateLimited {
            limit,
            retry_after,
            reset_at,
        } = self
        {
            let headers = resp.headers_mut();
            headers.insert(header::RETRY_AFTER, retry_after.into());
            crate::rate_limit::set_rate_limit_headers(headers, limit, 0, reset_at);
        }

        resp
    }
}
