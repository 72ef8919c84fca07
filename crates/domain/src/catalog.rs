//! Catalog entities read by the fulfillment workflow.
//!
//! Customers and products are owned by external catalog management; the
//! workflow only reads them, except for `Product::stock` which the inventory
//! ledger mutates.

use common::{CustomerId, Money, ProductId};
use serde::{Deserialize, Serialize};

/// A customer as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Tax registration number; absent for anonymous/general-public buyers.
    pub tax_id: Option<String>,
    pub address: String,
}

impl Customer {
    /// Creates a customer with no tax ID.
    pub fn new(
        id: CustomerId,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            tax_id: None,
            address: address.into(),
        }
    }

    /// Sets the tax ID.
    pub fn with_tax_id(mut self, tax_id: impl Into<String>) -> Self {
        self.tax_id = Some(tax_id.into());
        self
    }
}

/// A product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    pub category: String,
    /// Units available for sale.
    pub stock: u32,
}

impl Product {
    /// Creates a product with an empty description and category.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            unit_price,
            category: String::new(),
            stock,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Returns true if at least `quantity` units are in stock.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
