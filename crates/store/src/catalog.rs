//! Catalog lookup contract.

use async_trait::async_trait;
use common::{CustomerId, ProductId};
use domain::{Customer, Product};

use crate::Result;

/// Read-only access to customers and products.
///
/// Catalog management (creating and editing entries) lives outside this
/// service; the fulfillment workflow only looks entries up.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Looks up a customer. Returns `None` if it does not exist.
    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    /// Looks up a product with its current stock. Returns `None` if it does
    /// not exist.
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>>;
}
