//! Domain error types.

use thiserror::Error;

/// Errors raised while validating the shape of a fulfillment request
/// or restoring a stored sale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Customer ID is required.
    #[error("Customer ID is required")]
    CustomerIdRequired,

    /// The request carries no items.
    #[error("Sale has no items")]
    NoItems,

    /// An item line has an empty product ID.
    #[error("Item {line} has no product ID")]
    ProductIdRequired { line: usize },

    /// Invalid quantity on an item line.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: String, quantity: i64 },

    /// A line subtotal or the running total does not fit the amount range.
    #[error("Amount for {product_id} exceeds the supported range")]
    AmountOverflow { product_id: String },

    /// Stored total does not match the sum of its line items.
    #[error("Stored total {stored} does not match computed total {computed}")]
    TotalMismatch { stored: i64, computed: i64 },

    /// Unknown sale status label.
    #[error("Unknown sale status: {0}")]
    UnknownStatus(String),
}
