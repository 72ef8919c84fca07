//! Customer notification trait and implementations.

use std::sync::Arc;

use async_trait::async_trait;
use domain::Sale;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by a notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

/// Sends messages to customers. Delivery is at-least-once.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        (**self).send(recipient, subject, body).await
    }
}

/// A notification addressed to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    /// Builds the purchase confirmation for a persisted sale.
    pub fn purchase_confirmation(sale: &Sale) -> Self {
        let customer = sale.snapshot().customer();
        Self {
            recipient: customer.email.clone(),
            subject: format!("Purchase confirmed - {}", sale.folio()),
            body: format!(
                "Hello {},\n\nThank you for your purchase. \
                 Your receipt {} is available at:\n{}\n\nTotal: {}\n",
                customer.name,
                sale.folio(),
                sale.document_url(),
                sale.total()
            ),
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    outbox: Vec<Message>,
    fail_on_send: bool,
}

/// In-memory notifier recording every message, for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every send call.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.write().await.fail_on_send = fail;
    }

    /// Returns the messages sent so far.
    pub async fn sent(&self) -> Vec<Message> {
        self.state.read().await.outbox.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;
        if state.fail_on_send {
            return Err(NotifyError::Unavailable(
                "simulated notifier failure".to_string(),
            ));
        }
        state.outbox.push(Message {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Notifier that only writes the message to the log.
///
/// Stands in for an email gateway when the server runs without one.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if recipient.trim().is_empty() {
            return Err(NotifyError::Rejected("recipient address is empty".to_string()));
        }
        tracing::info!(recipient, subject, body_len = body.len(), "notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{CustomerId, Money, SaleId};
    use domain::{Customer, CustomerSnapshot, LineItem, Product, SaleSnapshot};

    fn sale() -> Sale {
        let customer =
            Customer::new(CustomerId::new(), "Ana", "ana@example.com", "555", "Street 1");
        let product = Product::new("P1", "Widget", Money::from_cents(150), 5);
        let snapshot = SaleSnapshot::new(
            SaleId::new(),
            customer.id,
            CustomerSnapshot::from(&customer),
            vec![LineItem::from_product(&product, 2)],
            "cash".to_string(),
            None,
            Utc::now(),
        );
        Sale::completed(snapshot, "mem://receipts/sale.txt")
    }

    #[test]
    fn test_purchase_confirmation() {
        let sale = sale();
        let message = Message::purchase_confirmation(&sale);
        assert_eq!(message.recipient, "ana@example.com");
        assert_eq!(message.subject, format!("Purchase confirmed - {}", sale.folio()));
        assert!(message.body.starts_with("Hello Ana,"));
        assert!(message.body.contains("mem://receipts/sale.txt"));
        assert!(message.body.contains("Total: $3.00"));
    }

    #[tokio::test]
    async fn test_in_memory_notifier_records_and_fails() {
        let notifier = InMemoryNotifier::new();
        notifier.send("a@b.c", "hi", "body").await.unwrap();
        assert_eq!(notifier.sent().await.len(), 1);

        notifier.set_fail_on_send(true).await;
        assert!(notifier.send("a@b.c", "hi", "body").await.is_err());
        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_rejects_blank_recipient() {
        assert!(LogNotifier.send("a@b.c", "s", "b").await.is_ok());
        assert!(matches!(
            LogNotifier.send("  ", "s", "b").await,
            Err(NotifyError::Rejected(_))
        ));
    }
}
