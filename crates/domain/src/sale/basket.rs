//! Basket pricing.

use std::collections::BTreeMap;

use common::{Money, ProductId};

use crate::catalog::Product;
use crate::error::DomainError;

use super::LineItem;

/// Line items priced from catalog data, in request order.
///
/// Keeps the combined requested quantity per product, so a product listed on
/// several lines is checked against stock once for its whole demand. Every
/// subtotal and the running total are overflow-checked as lines are added.
#[derive(Debug, Clone, Default)]
pub struct Basket {
    items: Vec<LineItem>,
    demand: BTreeMap<ProductId, u32>,
    total: Money,
}

impl Basket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line and returns the combined quantity now requested for the
    /// product across the basket.
    ///
    /// Fails without changing the basket if the line's subtotal or the new
    /// total would overflow.
    pub fn add(&mut self, product: &Product, quantity: u32) -> Result<u32, DomainError> {
        let overflow = || DomainError::AmountOverflow {
            product_id: product.id.to_string(),
        };
        let subtotal = product
            .unit_price
            .checked_multiply(quantity)
            .ok_or_else(overflow)?;
        self.total = self.total.checked_add(subtotal).ok_or_else(overflow)?;

        self.items.push(LineItem::from_product(product, quantity));
        let demand = self.demand.entry(product.id.clone()).or_insert(0);
        *demand = demand.saturating_add(quantity);
        Ok(*demand)
    }

    /// Returns the line items.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the combined quantity per product, ordered by product ID.
    pub fn demand(&self) -> impl Iterator<Item = (&ProductId, u32)> {
        self.demand.iter().map(|(id, qty)| (id, *qty))
    }

    /// Returns the sum of every line's subtotal.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Consumes the basket, returning its line items.
    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }
}
