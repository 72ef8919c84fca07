//! Fulfillment workflow steps.

use serde::Serialize;

/// A step of the fulfillment workflow, in execution order.
///
/// Steps up to and including `PriceBasket` are read-only; every step from
/// `ReserveInventory` on may leave side effects that need compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ValidateRequest,
    ResolveCustomer,
    PriceBasket,
    ReserveInventory,
    RenderDocument,
    UploadDocument,
    PersistSale,
    NotifyCustomer,
}

impl Step {
    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ValidateRequest => "validate_request",
            Step::ResolveCustomer => "resolve_customer",
            Step::PriceBasket => "price_basket",
            Step::ReserveInventory => "reserve_inventory",
            Step::RenderDocument => "render_document",
            Step::UploadDocument => "upload_document",
            Step::PersistSale => "persist_sale",
            Step::NotifyCustomer => "notify_customer",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
