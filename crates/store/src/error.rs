use common::{ProductId, SaleId};
use domain::DomainError;
use thiserror::Error;

use crate::ledger::ReservationItem;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// A conditional decrement found less stock than requested.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Another sale already uses this folio.
    #[error("Duplicate folio: {0}")]
    DuplicateFolio(String),

    /// A sale with this ID was already persisted.
    #[error("Sale already exists: {0}")]
    DuplicateSale(SaleId),

    /// The backend refused the operation (used by in-memory fault injection).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not satisfy the domain invariants.
    #[error("Corrupt record: {0}")]
    Corrupt(#[from] DomainError),
}

/// A reservation that stopped partway.
///
/// `applied` lists the decrements that took effect before the failing item;
/// the caller owns releasing them.
#[derive(Debug, Error)]
#[error(
    "Reservation failed at {product_id} with {applied_count} item(s) already applied: {cause}",
    applied_count = .applied.len()
)]
pub struct ReservationFailure {
    pub product_id: ProductId,
    pub applied: Vec<ReservationItem>,
    #[source]
    pub cause: StoreError,
}

impl ReservationFailure {
    /// Returns true if no decrement was applied.
    pub fn nothing_applied(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
