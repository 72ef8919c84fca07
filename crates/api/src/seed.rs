//! Demo catalog for running the server without a database.

use common::{CustomerId, Money};
use domain::{Customer, Product};
use store::InMemoryStore;

/// Fixed ID of the demo customer, so requests can be scripted.
pub const DEMO_CUSTOMER_ID: &str = "00000000-0000-4000-8000-000000000001";

/// Returns the demo customers.
pub fn demo_customers() -> Vec<Customer> {
    let id = uuid::Uuid::parse_str(DEMO_CUSTOMER_ID)
        .map(CustomerId::from_uuid)
        .unwrap_or_default();

    vec![
        Customer::new(
            id,
            "Demo Customer",
            "demo@example.com",
            "555-0100",
            "1 Market Street",
        ),
    ]
}

/// Returns the demo products.
pub fn demo_products() -> Vec<Product> {
    vec![
        Product::new("SKU-001", "Widget", Money::from_cents(1000), 50)
            .with_description("Standard widget")
            .with_category("hardware"),
        Product::new("SKU-002", "Gadget", Money::from_cents(2500), 20)
            .with_description("Multi-purpose gadget")
            .with_category("hardware"),
        Product::new("SKU-003", "Gizmo", Money::from_cents(499), 5)
            .with_description("Pocket gizmo")
            .with_category("accessories"),
    ]
}

/// Loads the demo customers and products into an in-memory store.
pub async fn seed_demo_catalog(store: &InMemoryStore) {
    for customer in demo_customers() {
        store.insert_customer(customer).await;
    }
    for product in demo_products() {
        store.insert_product(product).await;
    }
    tracing::info!(customer_id = DEMO_CUSTOMER_ID, "demo catalog loaded");
}
