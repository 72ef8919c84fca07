//! Fulfillment error types.

use common::{CustomerId, ProductId};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

use crate::compensation::CompensationReport;
use crate::steps::Step;

/// The closed set of failure categories a fulfillment can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    InsufficientStock,
    PartialReservationFailure,
    RenderFailure,
    StorageFailure,
    PersistenceFailure,
    DuplicateFolio,
    CatalogFailure,
    /// Never surfaced as a failure; used to label logs and metrics.
    NotificationFailure,
}

/// Who caused a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Server,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::PartialReservationFailure => "partial_reservation_failure",
            ErrorKind::RenderFailure => "render_failure",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::DuplicateFolio => "duplicate_folio",
            ErrorKind::CatalogFailure => "catalog_failure",
            ErrorKind::NotificationFailure => "notification_failure",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::InvalidRequest | ErrorKind::NotFound | ErrorKind::InsufficientStock => {
                ErrorClass::Client
            }
            _ => ErrorClass::Server,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that end a fulfillment.
#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    /// The request failed structural validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Requested quantity exceeds the available stock.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The catalog could not answer a lookup.
    #[error("Catalog lookup failed: {0}")]
    CatalogFailure(String),

    /// The ledger stopped partway through a reservation.
    #[error("Inventory reservation failed: {0}")]
    PartialReservation(String),

    #[error("Document rendering failed: {0}")]
    RenderFailure(String),

    #[error("Document upload failed: {0}")]
    StorageFailure(String),

    #[error("Sale persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("Folio already in use: {0}")]
    DuplicateFolio(String),
}

impl FulfillmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FulfillmentError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            FulfillmentError::CustomerNotFound(_) | FulfillmentError::ProductNotFound(_) => {
                ErrorKind::NotFound
            }
            FulfillmentError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            FulfillmentError::CatalogFailure(_) => ErrorKind::CatalogFailure,
            FulfillmentError::PartialReservation(_) => ErrorKind::PartialReservationFailure,
            FulfillmentError::RenderFailure(_) => ErrorKind::RenderFailure,
            FulfillmentError::StorageFailure(_) => ErrorKind::StorageFailure,
            FulfillmentError::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            FulfillmentError::DuplicateFolio(_) => ErrorKind::DuplicateFolio,
        }
    }

    /// Which entity was missing, for not-found errors.
    pub fn not_found_target(&self) -> Option<&'static str> {
        match self {
            FulfillmentError::CustomerNotFound(_) => Some("customer"),
            FulfillmentError::ProductNotFound(_) => Some("product"),
            _ => None,
        }
    }
}

/// A failed fulfillment: what went wrong, where, and what was undone.
#[derive(Debug, Clone, Error)]
#[error("{error} (step: {step})")]
pub struct FulfillmentFailure {
    #[source]
    pub error: FulfillmentError,
    pub step: Step,
    pub compensation: CompensationReport,
}

impl FulfillmentFailure {
    /// A failure raised before any side effect took place.
    pub fn without_side_effects(step: Step, error: impl Into<FulfillmentError>) -> Self {
        Self {
            error: error.into(),
            step,
            compensation: CompensationReport::default(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classes() {
        let not_found = FulfillmentError::ProductNotFound(ProductId::new("P9"));
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.kind().class(), ErrorClass::Client);

        let stock = FulfillmentError::InsufficientStock {
            product_id: ProductId::new("P1"),
            requested: 3,
            available: 1,
        };
        assert_eq!(stock.kind().class(), ErrorClass::Client);

        assert_eq!(
            FulfillmentError::CatalogFailure("down".into()).kind().class(),
            ErrorClass::Server
        );
        assert_eq!(
            FulfillmentError::DuplicateFolio("SALE-1".into()).kind(),
            ErrorKind::DuplicateFolio
        );
        assert_eq!(ErrorKind::NotificationFailure.class(), ErrorClass::Server);
    }

    #[test]
    fn test_not_found_target() {
        assert_eq!(
            FulfillmentError::CustomerNotFound(CustomerId::new()).not_found_target(),
            Some("customer")
        );
        assert_eq!(
            FulfillmentError::ProductNotFound(ProductId::new("P9")).not_found_target(),
            Some("product")
        );
        assert_eq!(
            FulfillmentError::StorageFailure("gone".into()).not_found_target(),
            None
        );
    }

    #[test]
    fn test_failure_display_names_step() {
        let failure = FulfillmentFailure::without_side_effects(
            Step::ValidateRequest,
            DomainError::NoItems,
        );
        assert_eq!(failure.kind(), ErrorKind::InvalidRequest);
        assert!(failure.to_string().ends_with("(step: validate_request)"));
        assert!(!failure.compensation.was_attempted());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PartialReservationFailure).unwrap();
        assert_eq!(json, "\"partial_reservation_failure\"");
    }
}
