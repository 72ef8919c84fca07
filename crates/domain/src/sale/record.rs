//! The immutable sale record.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, SaleId};
use serde::Serialize;

use crate::error::DomainError;

use super::{CustomerSnapshot, Folio, LineItem, SaleStatus};

/// Everything known about a sale before its document is stored.
///
/// This is what the document renderer consumes. The folio is derived from the
/// ID and the total from the line items; neither can be supplied separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleSnapshot {
    id: SaleId,
    folio: Folio,
    customer_id: CustomerId,
    customer: CustomerSnapshot,
    items: Vec<LineItem>,
    total: Money,
    payment_method: String,
    delivery_address: Option<String>,
    created_at: DateTime<Utc>,
}

impl SaleSnapshot {
    pub fn new(
        id: SaleId,
        customer_id: CustomerId,
        customer: CustomerSnapshot,
        items: Vec<LineItem>,
        payment_method: String,
        delivery_address: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total = items.iter().map(LineItem::subtotal).sum();
        Self {
            id,
            folio: Folio::for_sale(id),
            customer_id,
            customer,
            items,
            total,
            payment_method,
            delivery_address,
            created_at,
        }
    }

    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn folio(&self) -> &Folio {
        &self.folio
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A persisted sale. Created once per successful fulfillment and never
/// updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sale {
    #[serde(flatten)]
    snapshot: SaleSnapshot,
    document_url: String,
    status: SaleStatus,
}

impl Sale {
    /// Builds the completed sale once its document has been stored.
    pub fn completed(snapshot: SaleSnapshot, document_url: impl Into<String>) -> Self {
        Self {
            snapshot,
            document_url: document_url.into(),
            status: SaleStatus::Completed,
        }
    }

    /// Rebuilds a sale read from storage, checking the stored total against
    /// the stored line items.
    pub fn restore(
        snapshot: SaleSnapshot,
        document_url: String,
        status: SaleStatus,
        stored_total: Money,
    ) -> Result<Self, DomainError> {
        if snapshot.total != stored_total {
            return Err(DomainError::TotalMismatch {
                stored: stored_total.cents(),
                computed: snapshot.total.cents(),
            });
        }
        Ok(Self {
            snapshot,
            document_url,
            status,
        })
    }

    pub fn snapshot(&self) -> &SaleSnapshot {
        &self.snapshot
    }

    pub fn id(&self) -> SaleId {
        self.snapshot.id
    }

    pub fn folio(&self) -> &Folio {
        &self.snapshot.folio
    }

    pub fn customer_id(&self) -> CustomerId {
        self.snapshot.customer_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.snapshot.items
    }

    pub fn total(&self) -> Money {
        self.snapshot.total
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }
}
