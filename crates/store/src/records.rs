//! Sale record store contract.

use async_trait::async_trait;
use common::SaleId;
use domain::Sale;

use crate::Result;

/// Insert-once persistence for completed sales.
#[async_trait]
pub trait SaleRecordStore: Send + Sync {
    /// Persists a new sale.
    ///
    /// Fails with [`StoreError::DuplicateFolio`](crate::StoreError::DuplicateFolio)
    /// if another sale already carries the same folio.
    async fn create(&self, sale: &Sale) -> Result<()>;

    /// Loads a sale by ID.
    async fn get(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Loads a sale by folio.
    async fn get_by_folio(&self, folio: &str) -> Result<Option<Sale>>;
}
