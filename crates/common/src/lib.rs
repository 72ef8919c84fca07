//! Shared identifiers and value types used across the sale fulfillment crates.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CustomerId, ProductId, SaleId};
