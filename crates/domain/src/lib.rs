//! Domain layer for the sale fulfillment service.
//!
//! This crate provides the pure, I/O-free model the fulfillment workflow
//! operates on:
//! - Customer and Product catalog entities
//! - Fulfillment requests and their shape validation
//! - Line-item snapshots and basket pricing
//! - The immutable Sale record and its folio

pub mod catalog;
pub mod error;
pub mod sale;

pub use catalog::{Customer, Product};
pub use common::{CustomerId, Money, ProductId, SaleId};
pub use error::DomainError;
pub use sale::{
    Basket, CustomerSnapshot, Folio, FulfillmentRequest, GENERIC_TAX_ID, LineItem,
    ProductSnapshot, RequestedItem, Sale, SaleSnapshot, SaleStatus, ValidatedItem,
    ValidatedRequest,
};
