//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::{CompensationReport, ErrorKind, FulfillmentFailure};
use serde::Serialize;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Sale not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The fulfillment workflow failed.
    Fulfillment(FulfillmentFailure),
    /// Internal server error.
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
    pub step: Option<&'static str>,
    /// The missing entity (`customer`, `product` or `sale`) on not-found errors.
    pub target: Option<&'static str>,
    pub compensation: Option<CompensationReport>,
}

impl ApiError {
    /// Returns the HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Fulfillment(failure) => kind_to_status(failure.kind()),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn kind_to_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InsufficientStock => StatusCode::CONFLICT,
        ErrorKind::PartialReservationFailure
        | ErrorKind::RenderFailure
        | ErrorKind::StorageFailure
        | ErrorKind::PersistenceFailure
        | ErrorKind::DuplicateFolio
        | ErrorKind::CatalogFailure
        | ErrorKind::NotificationFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::NotFound(msg) => ErrorBody {
                error: msg,
                kind: ErrorKind::NotFound.as_str(),
                step: None,
                target: Some("sale"),
                compensation: None,
            },
            ApiError::BadRequest(msg) => ErrorBody {
                error: msg,
                kind: ErrorKind::InvalidRequest.as_str(),
                step: None,
                target: None,
                compensation: None,
            },
            ApiError::Fulfillment(failure) => ErrorBody {
                error: failure.error.to_string(),
                kind: failure.kind().as_str(),
                step: Some(failure.step.as_str()),
                target: failure.error.not_found_target(),
                compensation: Some(failure.compensation),
            },
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                ErrorBody {
                    error: msg,
                    kind: "internal",
                    step: None,
                    target: None,
                    compensation: None,
                }
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<FulfillmentFailure> for ApiError {
    fn from(failure: FulfillmentFailure) -> Self {
        ApiError::Fulfillment(failure)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
