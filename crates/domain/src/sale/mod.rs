//! Sale record and the types that build it.

mod basket;
mod record;
mod request;
mod state;
mod value_objects;

pub use basket::Basket;
pub use record::{Sale, SaleSnapshot};
pub use request::{FulfillmentRequest, RequestedItem, ValidatedItem, ValidatedRequest};
pub use state::SaleStatus;
pub use value_objects::{CustomerSnapshot, Folio, GENERIC_TAX_ID, LineItem, ProductSnapshot};
