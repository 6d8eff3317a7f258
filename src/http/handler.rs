//! Route handlers and their error type.
//!
//! A handler is any `Fn(Context) -> impl Future<Output = HandlerResult>`.
//! Errors are turned into JSON error responses here, so a failing handler
//! never reaches the server or the app.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Json;
use thiserror::Error;

use crate::http::context::Context;
use crate::lifecycle::shutdown::BoxError;
use crate::observability::Logger;

pub type HandlerResult = Result<Response, HandlerError>;

/// Failure signalled by a route handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A client-facing error with its status code.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    /// An unexpected failure; the client only sees a generic 500.
    #[error("internal error: {0}")]
    Internal(#[source] BoxError),
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        HandlerError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(error: impl Into<BoxError>) -> Self {
        HandlerError::Internal(error.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Status { status, .. } => *status,
            HandlerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            HandlerError::Status { message, .. } => message,
            HandlerError::Internal(_) => "internal server error".to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Wrap `handler` into an axum method router that builds a fresh [`Context`]
/// per request around the shared logger.
pub(crate) fn method_router<H, Fut>(filter: MethodFilter, handler: H, log: Logger) -> MethodRouter
where
    H: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let handler = Arc::new(handler);

    on(filter, move |request: Request| {
        let handler = Arc::clone(&handler);
        let log = log.clone();
        async move {
            let (mut parts, body) = request.into_parts();
            let params = RawPathParams::from_request_parts(&mut parts, &())
                .await
                .map(|raw| {
                    raw.iter()
                        .map(|(key, value)| (key.to_owned(), value.to_owned()))
                        .collect()
                })
                .unwrap_or_default();

            let ctx = Context::new(parts, body, params, log);
            let method = ctx.method().clone();
            let path = ctx.path().to_owned();

            match handler(ctx).await {
                Ok(response) => response,
                Err(err) => {
                    match &err {
                        HandlerError::Internal(source) => {
                            tracing::error!(%method, %path, error = %source, "Handler failed")
                        }
                        HandlerError::Status { status, message } => {
                            tracing::debug!(%method, %path, %status, %message, "Handler rejected request")
                        }
                    }
                    err.into_response()
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_errors_keep_their_code() {
        let err = HandlerError::not_found("no such user");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_errors_map_to_500() {
        let err = HandlerError::internal(std::io::Error::other("db down"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("db down"));
    }
}
