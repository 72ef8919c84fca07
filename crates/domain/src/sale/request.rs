//! Fulfillment requests and shape validation.

use common::{CustomerId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A requested basket line, as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: ProductId,
    /// Signed so that negative input is rejected by validation rather than
    /// by deserialization.
    pub quantity: i64,
}

impl RequestedItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Request to fulfill a sale.
///
/// Any client-supplied total is ignored; totals are always computed from the
/// catalog prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRequest {
    pub customer_id: Option<CustomerId>,
    pub items: Vec<RequestedItem>,
    pub payment_method: String,
    pub delivery_address: Option<String>,
}

impl FulfillmentRequest {
    /// Creates a request for a customer with the given items.
    pub fn new(customer_id: CustomerId, items: Vec<RequestedItem>) -> Self {
        Self {
            customer_id: Some(customer_id),
            items,
            payment_method: String::new(),
            delivery_address: None,
        }
    }

    /// Sets the payment method.
    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = payment_method.into();
        self
    }

    /// Sets the delivery address.
    pub fn with_delivery_address(mut self, address: impl Into<String>) -> Self {
        self.delivery_address = Some(address.into());
        self
    }

    /// Checks the request shape: a customer, at least one item, every item
    /// naming a product and a quantity that fits in `1..=u32::MAX`.
    pub fn validate(self) -> Result<ValidatedRequest, DomainError> {
        let customer_id = self.customer_id.ok_or(DomainError::CustomerIdRequired)?;

        if self.items.is_empty() {
            return Err(DomainError::NoItems);
        }

        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(line, item)| {
                if item.product_id.is_blank() {
                    return Err(DomainError::ProductIdRequired { line });
                }
                let quantity = u32::try_from(item.quantity)
                    .ok()
                    .filter(|q| *q > 0)
                    .ok_or_else(|| DomainError::InvalidQuantity {
                        product_id: item.product_id.to_string(),
                        quantity: item.quantity,
                    })?;
                Ok(ValidatedItem {
                    product_id: item.product_id,
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedRequest {
            customer_id,
            items,
            payment_method: self.payment_method,
            delivery_address: self.delivery_address,
        })
    }
}

/// A basket line that passed shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A request that passed shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub customer_id: CustomerId,
    pub items: Vec<ValidatedItem>,
    pub payment_method: String,
    pub delivery_address: Option<String>,
}
