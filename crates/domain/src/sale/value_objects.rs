//! Value objects for the sale domain.

use common::{Money, ProductId, SaleId};
use serde::{Deserialize, Serialize};

use crate::catalog::{Customer, Product};

/// Tax ID printed for customers that have none on file.
pub const GENERIC_TAX_ID: &str = "GENERIC";

const FOLIO_PREFIX: &str = "SALE-";
const FOLIO_SUFFIX_LEN: usize = 12;

/// Human-readable sale code, derived from the sale ID.
///
/// Format: `SALE-` followed by the last 12 hex digits of the ID, uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Folio(String);

impl Folio {
    /// Derives the folio for a sale ID.
    pub fn for_sale(id: SaleId) -> Self {
        let hex = id.to_hex();
        let suffix = &hex[hex.len() - FOLIO_SUFFIX_LEN..];
        Self(format!("{FOLIO_PREFIX}{}", suffix.to_uppercase()))
    }

    /// Returns the folio as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `s` is shaped like a folio.
    pub fn is_well_formed(s: &str) -> bool {
        s.strip_prefix(FOLIO_PREFIX).is_some_and(|suffix| {
            suffix.len() == FOLIO_SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        })
    }
}

impl std::fmt::Display for Folio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product data frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    pub category: String,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            unit_price: product.unit_price,
            category: product.category.clone(),
        }
    }
}

/// Customer data frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: Option<String>,
    pub address: String,
}

impl CustomerSnapshot {
    /// Returns the tax ID, or the generic placeholder when none is on file.
    pub fn tax_id_or_generic(&self) -> &str {
        self.tax_id
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(GENERIC_TAX_ID)
    }
}

impl From<&Customer> for CustomerSnapshot {
    fn from(customer: &Customer) -> Self {
        Self {
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            tax_id: customer.tax_id.clone(),
            address: customer.address.clone(),
        }
    }
}

/// A line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product data at order time.
    pub snapshot: ProductSnapshot,

    /// Quantity sold.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a line item from the current catalog state of a product.
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            snapshot: ProductSnapshot::from(product),
            quantity,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn subtotal(&self) -> Money {
        self.snapshot.unit_price.multiply(self.quantity)
    }
}
