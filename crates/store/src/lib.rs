//! Storage for the sale fulfillment service.
//!
//! Three collaborator contracts are defined here, each with an in-memory
//! implementation (tests, local runs) and a PostgreSQL implementation:
//! - [`Catalog`]: read-only customer and product lookup
//! - [`InventoryLedger`]: per-product stock reservation and release
//! - [`SaleRecordStore`]: insert-once persistence of completed sales

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod records;

pub use catalog::Catalog;
pub use error::{ReservationFailure, Result, StoreError};
pub use ledger::{InventoryLedger, ReservationItem};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::SaleRecordStore;
