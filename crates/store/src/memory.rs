use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{CustomerId, ProductId, SaleId};
use domain::{Customer, Product, Sale};
use tokio::sync::{Mutex, RwLock};

use crate::{
    Catalog, InventoryLedger, ReservationFailure, ReservationItem, Result, SaleRecordStore,
    StoreError,
};

/// Catalog entry plus its independently lockable stock counter.
struct ProductEntry {
    product: Product,
    stock: Arc<Mutex<u32>>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_lookup: bool,
    fail_reserve_after: Option<usize>,
    reserve_ack_delay: Option<Duration>,
    fail_on_release: bool,
    fail_on_create: bool,
    duplicate_folio_on_create: bool,
    create_delay: Option<Duration>,
    create_ack_delay: Option<Duration>,
    fail_on_get: bool,
}

#[derive(Default)]
struct Sales {
    by_id: HashMap<SaleId, Sale>,
    by_folio: HashMap<String, SaleId>,
}

/// In-memory catalog, ledger and sale store.
///
/// Stock counters sit behind one mutex per product, so reservations for the
/// same product serialize while disjoint products proceed in parallel.
/// Fault-injection switches let tests fail individual operations.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
    products: Arc<RwLock<HashMap<ProductId, ProductEntry>>>,
    sales: Arc<RwLock<Sales>>,
    faults: Arc<RwLock<Faults>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a customer.
    pub async fn insert_customer(&self, customer: Customer) {
        self.customers.write().await.insert(customer.id, customer);
    }

    /// Inserts or replaces a product; its `stock` becomes the ledger count.
    pub async fn insert_product(&self, product: Product) {
        let stock = Arc::new(Mutex::new(product.stock));
        self.products
            .write()
            .await
            .insert(product.id.clone(), ProductEntry { product, stock });
    }

    /// Returns the number of persisted sales.
    pub async fn sale_count(&self) -> usize {
        self.sales.read().await.by_id.len()
    }

    /// Configures catalog lookups to fail.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.faults.write().await.fail_on_lookup = fail;
    }

    /// Configures reservations to fail once `applied` items have been
    /// decremented. `None` disables the fault.
    pub async fn set_fail_reserve_after(&self, applied: Option<usize>) {
        self.faults.write().await.fail_reserve_after = applied;
    }

    /// Delays the answer of a successful reservation by `delay`, after every
    /// item has been decremented.
    pub async fn set_reserve_ack_delay(&self, delay: Option<Duration>) {
        self.faults.write().await.reserve_ack_delay = delay;
    }

    /// Configures releases to fail.
    pub async fn set_fail_on_release(&self, fail: bool) {
        self.faults.write().await.fail_on_release = fail;
    }

    /// Configures sale creation to fail.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.faults.write().await.fail_on_create = fail;
    }

    /// Configures sale creation to report a folio conflict.
    pub async fn set_duplicate_folio_on_create(&self, duplicate: bool) {
        self.faults.write().await.duplicate_folio_on_create = duplicate;
    }

    /// Stalls sale creation for `delay` before anything is stored.
    pub async fn set_create_delay(&self, delay: Option<Duration>) {
        self.faults.write().await.create_delay = delay;
    }

    /// Stalls sale creation for `delay` after the sale has been stored.
    pub async fn set_create_ack_delay(&self, delay: Option<Duration>) {
        self.faults.write().await.create_ack_delay = delay;
    }

    /// Configures sale reads by ID to fail.
    pub async fn set_fail_on_get(&self, fail: bool) {
        self.faults.write().await.fail_on_get = fail;
    }

    async fn stock_cell(&self, product_id: &ProductId) -> Option<Arc<Mutex<u32>>> {
        self.products
            .read()
            .await
            .get(product_id)
            .map(|entry| Arc::clone(&entry.stock))
    }

    async fn decrement(&self, item: &ReservationItem) -> Result<()> {
        let cell = self
            .stock_cell(&item.product_id)
            .await
            .ok_or_else(|| StoreError::ProductNotFound(item.product_id.clone()))?;

        let mut stock = cell.lock().await;
        if *stock < item.quantity {
            return Err(StoreError::InsufficientStock {
                product_id: item.product_id.clone(),
                requested: item.quantity,
                available: *stock,
            });
        }
        *stock -= item.quantity;
        Ok(())
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        if self.faults.read().await.fail_on_lookup {
            return Err(StoreError::Unavailable("catalog lookup refused".to_string()));
        }
        Ok(self.customers.read().await.get(&id).cloned())
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        if self.faults.read().await.fail_on_lookup {
            return Err(StoreError::Unavailable("catalog lookup refused".to_string()));
        }
        let (mut product, cell) = {
            let products = self.products.read().await;
            match products.get(id) {
                Some(entry) => (entry.product.clone(), Arc::clone(&entry.stock)),
                None => return Ok(None),
            }
        };
        product.stock = *cell.lock().await;
        Ok(Some(product))
    }
}

#[async_trait]
impl InventoryLedger for InMemoryStore {
    async fn reserve(
        &self,
        items: &[ReservationItem],
    ) -> std::result::Result<(), ReservationFailure> {
        let (fail_after, ack_delay) = {
            let faults = self.faults.read().await;
            (faults.fail_reserve_after, faults.reserve_ack_delay)
        };
        let mut applied = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            if fail_after == Some(index) {
                return Err(ReservationFailure {
                    product_id: item.product_id.clone(),
                    applied,
                    cause: StoreError::Unavailable("reservation refused".to_string()),
                });
            }
            if let Err(cause) = self.decrement(item).await {
                tracing::debug!(
                    product_id = %item.product_id,
                    applied = applied.len(),
                    %cause,
                    "reservation stopped"
                );
                return Err(ReservationFailure {
                    product_id: item.product_id.clone(),
                    applied,
                    cause,
                });
            }
            applied.push(item.clone());
        }

        if let Some(delay) = ack_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn release(&self, items: &[ReservationItem]) -> Result<()> {
        if self.faults.read().await.fail_on_release {
            return Err(StoreError::Unavailable("release refused".to_string()));
        }
        for item in items {
            let cell = self
                .stock_cell(&item.product_id)
                .await
                .ok_or_else(|| StoreError::ProductNotFound(item.product_id.clone()))?;
            let mut stock = cell.lock().await;
            *stock = stock.saturating_add(item.quantity);
        }
        Ok(())
    }

    async fn stock_level(&self, product_id: &ProductId) -> Result<Option<u32>> {
        match self.stock_cell(product_id).await {
            Some(cell) => Ok(Some(*cell.lock().await)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SaleRecordStore for InMemoryStore {
    async fn create(&self, sale: &Sale) -> Result<()> {
        let (create_delay, ack_delay) = {
            let faults = self.faults.read().await;
            if faults.fail_on_create {
                return Err(StoreError::Unavailable("sale insert refused".to_string()));
            }
            if faults.duplicate_folio_on_create {
                return Err(StoreError::DuplicateFolio(sale.folio().to_string()));
            }
            (faults.create_delay, faults.create_ack_delay)
        };
        if let Some(delay) = create_delay {
            tokio::time::sleep(delay).await;
        }

        let folio = sale.folio().as_str().to_string();
        {
            let mut sales = self.sales.write().await;
            if sales.by_id.contains_key(&sale.id()) {
                return Err(StoreError::DuplicateSale(sale.id()));
            }
            if sales.by_folio.contains_key(&folio) {
                return Err(StoreError::DuplicateFolio(folio));
            }
            sales.by_folio.insert(folio, sale.id());
            sales.by_id.insert(sale.id(), sale.clone());
        }

        if let Some(delay) = ack_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn get(&self, id: SaleId) -> Result<Option<Sale>> {
        if self.faults.read().await.fail_on_get {
            return Err(StoreError::Unavailable("sale read refused".to_string()));
        }
        Ok(self.sales.read().await.by_id.get(&id).cloned())
    }

    async fn get_by_folio(&self, folio: &str) -> Result<Option<Sale>> {
        let sales = self.sales.read().await;
        Ok(sales
            .by_folio
            .get(folio)
            .and_then(|id| sales.by_id.get(id))
            .cloned())
    }
}
