//! Inventory ledger contract.

use async_trait::async_trait;
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::{ReservationFailure, Result};

/// A quantity of one product to take out of (or put back into) stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ReservationItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Owner of per-product stock counters.
///
/// Implementations guarantee:
/// - each item's check-and-decrement is one indivisible operation;
/// - concurrent reservations touching the same product serialize, so stock
///   never goes negative;
/// - reservations touching disjoint products do not block each other.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Decrements stock for every item.
    ///
    /// On failure, the returned [`ReservationFailure`] lists the items whose
    /// decrement was applied before the failing one.
    async fn reserve(
        &self,
        items: &[ReservationItem],
    ) -> std::result::Result<(), ReservationFailure>;

    /// Adds quantities back to stock. Used as compensation.
    async fn release(&self, items: &[ReservationItem]) -> Result<()>;

    /// Returns the current stock of a product, or `None` if it does not exist.
    async fn stock_level(&self, product_id: &ProductId) -> Result<Option<u32>>;
}
