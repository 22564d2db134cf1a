//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, GatewayError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unknown caller credentials.
    Unauthorized(String),
    /// The payment provider failed; carries its error body verbatim.
    Gateway { message: String, detail: String },
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, &msg),
            ApiError::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
            ApiError::Unauthorized(msg) => error_response(StatusCode::UNAUTHORIZED, &msg),
            ApiError::Gateway { message, detail } => {
                // Pass the provider's body through for diagnostics. It is
                // usually JSON; fall back to a plain string when not.
                let gateway_body = serde_json::from_str::<serde_json::Value>(&detail)
                    .unwrap_or(serde_json::Value::String(detail));
                let body = serde_json::json!({ "error": message, "gateway": gateway_body });
                (StatusCode::BAD_GATEWAY, axum::Json(body)).into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg)
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message });
    (status, axum::Json(body)).into_response()
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::UserNotFound(_) | CheckoutError::OrderNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            CheckoutError::EmptyCart
            | CheckoutError::ProductNotFound(_)
            | CheckoutError::OrderAlreadyProcessed { .. }
            | CheckoutError::Order(_) => ApiError::BadRequest(err.to_string()),
            CheckoutError::Gateway(gateway_err) => match gateway_err {
                GatewayError::Rejected { status, body } => ApiError::Gateway {
                    message: format!("payment gateway rejected the request ({status})"),
                    detail: body,
                },
                other => ApiError::Gateway {
                    message: "payment gateway unavailable".to_string(),
                    detail: other.to_string(),
                },
            },
            CheckoutError::UnknownInvoice(_) => ApiError::NotFound(err.to_string()),
            CheckoutError::Cart(_)
            | CheckoutError::Catalog(_)
            | CheckoutError::Identity(_)
            | CheckoutError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}
