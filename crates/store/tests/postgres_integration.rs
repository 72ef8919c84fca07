//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency. Each test
//! works on its own customers, products and sales, so they can run in
//! parallel. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, Money, ProductId, SaleId};
use domain::{Customer, CustomerSnapshot, LineItem, Product, Sale, SaleSnapshot, SaleStatus};
use sqlx::PgPool;
use store::{
    Catalog, InventoryLedger, PostgresStore, ReservationItem, SaleRecordStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn unique_sku(prefix: &str) -> ProductId {
    ProductId::new(format!("{prefix}-{}", &SaleId::new().to_hex()[..8]))
}

async fn seed_product(store: &PostgresStore, price_cents: i64, stock: u32) -> ProductId {
    let id = unique_sku("SKU");
    let product = Product::new(id.clone(), "Widget", Money::from_cents(price_cents), stock)
        .with_description("A widget")
        .with_category("tools");
    store.upsert_product(&product).await.unwrap();
    id
}

fn make_sale(id: SaleId, product_id: &ProductId) -> Sale {
    let customer = Customer::new(CustomerId::new(), "Ana", "ana@example.com", "555", "Street 1");
    let product = Product::new(product_id.clone(), "Widget", Money::from_cents(100), 0);
    let snapshot = SaleSnapshot::new(
        id,
        customer.id,
        CustomerSnapshot::from(&customer),
        vec![LineItem::from_product(&product, 2)],
        "card".to_string(),
        Some("Street 1".to_string()),
        Utc::now(),
    );
    Sale::completed(snapshot, "file:///receipts/sale.txt")
}

#[tokio::test]
async fn find_customer_and_product() {
    let store = get_test_store().await;
    let customer = Customer::new(CustomerId::new(), "Ana", "ana@example.com", "555", "Street 1")
        .with_tax_id("AAA010101AAA");
    store.upsert_customer(&customer).await.unwrap();
    let product_id = seed_product(&store, 100, 5).await;

    let found = store.find_customer(customer.id).await.unwrap().unwrap();
    assert_eq!(found, customer);

    let product = store.find_product(&product_id).await.unwrap().unwrap();
    assert_eq!(product.unit_price.cents(), 100);
    assert_eq!(product.stock, 5);
    assert_eq!(product.category, "tools");

    assert!(store.find_customer(CustomerId::new()).await.unwrap().is_none());
    assert!(store.find_product(&unique_sku("NONE")).await.unwrap().is_none());
}

#[tokio::test]
async fn reserve_and_release_stock() {
    let store = get_test_store().await;
    let p1 = seed_product(&store, 100, 5).await;
    let p2 = seed_product(&store, 250, 2).await;

    let items = vec![
        ReservationItem::new(p1.clone(), 2),
        ReservationItem::new(p2.clone(), 2),
    ];
    store.reserve(&items).await.unwrap();
    assert_eq!(store.stock_level(&p1).await.unwrap(), Some(3));
    assert_eq!(store.stock_level(&p2).await.unwrap(), Some(0));

    store.release(&items).await.unwrap();
    assert_eq!(store.stock_level(&p1).await.unwrap(), Some(5));
    assert_eq!(store.stock_level(&p2).await.unwrap(), Some(2));
}

#[tokio::test]
async fn failed_reservation_rolls_back_every_item() {
    let store = get_test_store().await;
    let p1 = seed_product(&store, 100, 5).await;
    let p2 = seed_product(&store, 250, 1).await;

    let failure = store
        .reserve(&[
            ReservationItem::new(p1.clone(), 2),
            ReservationItem::new(p2.clone(), 3),
        ])
        .await
        .unwrap_err();

    assert_eq!(failure.product_id, p2);
    assert!(failure.nothing_applied());
    assert!(matches!(
        failure.cause,
        StoreError::InsufficientStock {
            requested: 3,
            available: 1,
            ..
        }
    ));
    assert_eq!(store.stock_level(&p1).await.unwrap(), Some(5));
    assert_eq!(store.stock_level(&p2).await.unwrap(), Some(1));
}

#[tokio::test]
async fn reserve_unknown_product() {
    let store = get_test_store().await;
    let missing = unique_sku("MISSING");

    let failure = store
        .reserve(&[ReservationItem::new(missing.clone(), 1)])
        .await
        .unwrap_err();
    assert!(matches!(failure.cause, StoreError::ProductNotFound(id) if id == missing));
}

#[tokio::test]
async fn concurrent_reservations_never_oversell() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 100, 7).await;

    let attempts = (0..10).map(|_| {
        let store = store.clone();
        let item = ReservationItem::new(product_id.clone(), 2);
        async move { store.reserve(&[item]).await.is_ok() }
    });
    let results = futures_util::future::join_all(attempts).await;

    assert_eq!(results.into_iter().filter(|ok| *ok).count(), 3);
    assert_eq!(store.stock_level(&product_id).await.unwrap(), Some(1));
}

#[tokio::test]
async fn create_and_load_sale() {
    let store = get_test_store().await;
    let product_id = unique_sku("SKU");
    let sale = make_sale(SaleId::new(), &product_id);

    store.create(&sale).await.unwrap();

    let loaded = store.get(sale.id()).await.unwrap().unwrap();
    assert_eq!(loaded.folio(), sale.folio());
    assert_eq!(loaded.total().cents(), 200);
    assert_eq!(loaded.items(), sale.items());
    assert_eq!(loaded.status(), SaleStatus::Completed);
    assert_eq!(loaded.document_url(), "file:///receipts/sale.txt");
    assert_eq!(loaded.snapshot().delivery_address(), Some("Street 1"));

    let by_folio = store
        .get_by_folio(sale.folio().as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_folio.id(), sale.id());

    assert!(store.get(SaleId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_sale_and_folio_rejected() {
    let store = get_test_store().await;
    let product_id = unique_sku("SKU");
    let suffix = &SaleId::new().to_hex()[20..];
    let first = SaleId::from_uuid(
        uuid::Uuid::parse_str(&format!("00000000-0000-4000-8000-{suffix}")).unwrap(),
    );
    let second = SaleId::from_uuid(
        uuid::Uuid::parse_str(&format!("11111111-1111-4111-8111-{suffix}")).unwrap(),
    );

    let sale = make_sale(first, &product_id);
    store.create(&sale).await.unwrap();

    assert!(matches!(
        store.create(&sale).await,
        Err(StoreError::DuplicateSale(_) | StoreError::DuplicateFolio(_))
    ));
    assert!(matches!(
        store.create(&make_sale(second, &product_id)).await,
        Err(StoreError::DuplicateFolio(_))
    ));
}
