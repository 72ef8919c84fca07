use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, ProductId, SaleId};
use domain::{Customer, CustomerSnapshot, LineItem, Product, Sale, SaleSnapshot, SaleStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Catalog, InventoryLedger, ReservationFailure, ReservationItem, Result, SaleRecordStore,
    StoreError,
};

const SELECT_SALE_BY_ID: &str = r#"
    SELECT id, folio, customer_id, customer_snapshot, items, total_cents,
           document_url, status, payment_method, delivery_address, created_at
    FROM sales
    WHERE id = $1
"#;

const SELECT_SALE_BY_FOLIO: &str = r#"
    SELECT id, folio, customer_id, customer_snapshot, items, total_cents,
           document_url, status, payment_method, delivery_address, created_at
    FROM sales
    WHERE folio = $1
"#;

/// PostgreSQL-backed catalog, ledger and sale store.
///
/// Reservations run in one transaction using conditional updates
/// (`stock >= quantity`), touching rows in product-ID order so concurrent
/// baskets cannot deadlock on each other.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of up to `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    /// Inserts or replaces a customer. Used for seeding.
    pub async fn upsert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, tax_id, address)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name, email = EXCLUDED.email, phone = EXCLUDED.phone,
                tax_id = EXCLUDED.tax_id, address = EXCLUDED.address
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.tax_id)
        .bind(&customer.address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts or replaces a product, including its stock. Used for seeding.
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, unit_price_cents, category, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name, description = EXCLUDED.description,
                unit_price_cents = EXCLUDED.unit_price_cents,
                category = EXCLUDED.category, stock = EXCLUDED.stock
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.unit_price.cents())
        .bind(&product.category)
        .bind(i64::from(product.stock))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn stock_from_db(stock: i64) -> u32 {
        u32::try_from(stock.max(0)).unwrap_or(u32::MAX)
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            tax_id: row.try_get("tax_id")?,
            address: row.try_get("address")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            category: row.try_get("category")?,
            stock: Self::stock_from_db(row.try_get("stock")?),
        })
    }

    fn row_to_sale(row: PgRow) -> Result<Sale> {
        let customer: CustomerSnapshot = serde_json::from_value(row.try_get("customer_snapshot")?)?;
        let items: Vec<LineItem> = serde_json::from_value(row.try_get("items")?)?;
        let status: SaleStatus = row.try_get::<String, _>("status")?.parse()?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        let snapshot = SaleSnapshot::new(
            SaleId::from_uuid(row.try_get::<Uuid, _>("id")?),
            CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            customer,
            items,
            row.try_get("payment_method")?,
            row.try_get("delivery_address")?,
            created_at,
        );

        Ok(Sale::restore(
            snapshot,
            row.try_get("document_url")?,
            status,
            Money::from_cents(row.try_get("total_cents")?),
        )?)
    }

    async fn current_stock(
        executor: impl sqlx::PgExecutor<'_>,
        product_id: &ProductId,
    ) -> Result<Option<u32>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(executor)
            .await?;
        Ok(stock.map(Self::stock_from_db))
    }

    async fn reserve_in_tx(
        &self,
        items: &[ReservationItem],
    ) -> std::result::Result<(), (ProductId, StoreError)> {
        let first = items
            .first()
            .map(|i| i.product_id.clone())
            .unwrap_or_else(|| ProductId::new(""));

        let mut ordered: Vec<&ReservationItem> = items.iter().collect();
        ordered.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| (first.clone(), StoreError::Database(e)))?;

        for item in ordered {
            let wrap = |e: sqlx::Error| (item.product_id.clone(), StoreError::Database(e));

            let remaining: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE products SET stock = stock - $2
                WHERE id = $1 AND stock >= $2
                RETURNING stock
                "#,
            )
            .bind(item.product_id.as_str())
            .bind(i64::from(item.quantity))
            .fetch_optional(&mut *tx)
            .await
            .map_err(wrap)?;

            if remaining.is_none() {
                let cause = match Self::current_stock(&mut *tx, &item.product_id).await {
                    Ok(Some(available)) => StoreError::InsufficientStock {
                        product_id: item.product_id.clone(),
                        requested: item.quantity,
                        available,
                    },
                    Ok(None) => StoreError::ProductNotFound(item.product_id.clone()),
                    Err(e) => e,
                };
                tracing::debug!(product_id = %item.product_id, %cause, "reservation rolled back");
                return Err((item.product_id.clone(), cause));
            }
        }

        tx.commit()
            .await
            .map_err(|e| (first, StoreError::Database(e)))?;
        Ok(())
    }
}

#[async_trait]
impl Catalog for PostgresStore {
    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, tax_id, address FROM customers WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, unit_price_cents, category, stock
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }
}

#[async_trait]
impl InventoryLedger for PostgresStore {
    async fn reserve(
        &self,
        items: &[ReservationItem],
    ) -> std::result::Result<(), ReservationFailure> {
        // The transaction rolls back on any failure, so nothing is ever
        // left applied.
        self.reserve_in_tx(items)
            .await
            .map_err(|(product_id, cause)| ReservationFailure {
                product_id,
                applied: Vec::new(),
                cause,
            })
    }

    async fn release(&self, items: &[ReservationItem]) -> Result<()> {
        let mut ordered: Vec<&ReservationItem> = items.iter().collect();
        ordered.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let mut tx = self.pool.begin().await?;
        for item in ordered {
            let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
                .bind(item.product_id.as_str())
                .bind(i64::from(item.quantity))
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::ProductNotFound(item.product_id.clone()));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn stock_level(&self, product_id: &ProductId) -> Result<Option<u32>> {
        Self::current_stock(&self.pool, product_id).await
    }
}

#[async_trait]
impl SaleRecordStore for PostgresStore {
    async fn create(&self, sale: &Sale) -> Result<()> {
        let snapshot = sale.snapshot();
        let customer_json = serde_json::to_value(snapshot.customer())?;
        let items_json = serde_json::to_value(snapshot.items())?;

        sqlx::query(
            r#"
            INSERT INTO sales (id, folio, customer_id, customer_snapshot, items, total_cents,
                               document_url, status, payment_method, delivery_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(sale.id().as_uuid())
        .bind(sale.folio().as_str())
        .bind(sale.customer_id().as_uuid())
        .bind(customer_json)
        .bind(items_json)
        .bind(sale.total().cents())
        .bind(sale.document_url())
        .bind(sale.status().as_str())
        .bind(snapshot.payment_method())
        .bind(snapshot.delivery_address())
        .bind(snapshot.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("unique_sale_folio") => {
                        return StoreError::DuplicateFolio(sale.folio().to_string());
                    }
                    Some("sales_pkey") => return StoreError::DuplicateSale(sale.id()),
                    _ => {}
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, id: SaleId) -> Result<Option<Sale>> {
        let row = sqlx::query(SELECT_SALE_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_sale).transpose()
    }

    async fn get_by_folio(&self, folio: &str) -> Result<Option<Sale>> {
        let row = sqlx::query(SELECT_SALE_BY_FOLIO)
            .bind(folio)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_sale).transpose()
    }
}
