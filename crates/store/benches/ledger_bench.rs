use common::Money;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::Product;
use store::{InMemoryStore, InventoryLedger, ReservationItem};

fn seeded_store(rt: &tokio::runtime::Runtime, products: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    rt.block_on(async {
        for i in 0..products {
            store
                .insert_product(Product::new(
                    format!("SKU-{i:04}"),
                    "Bench Widget",
                    Money::from_cents(1000),
                    u32::MAX,
                ))
                .await;
        }
    });
    store
}

fn bench_reserve_single_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 1);
    let items = vec![ReservationItem::new("SKU-0000", 1)];

    c.bench_function("ledger/reserve_single_item", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.reserve(&items).await.unwrap();
            });
        });
    });
}

fn bench_reserve_and_release_basket(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 10);
    let items: Vec<_> = (0..10)
        .map(|i| ReservationItem::new(format!("SKU-{i:04}"), 2))
        .collect();

    c.bench_function("ledger/reserve_release_10_items", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.reserve(&items).await.unwrap();
                store.release(&items).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_reserve_single_item,
    bench_reserve_and_release_basket
);
criterion_main!(benches);
