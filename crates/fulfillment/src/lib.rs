//! Sale fulfillment workflow.
//!
//! Turns a validated purchase request into a persisted sale with a stored
//! receipt, in two phases:
//! 1. Validate the request, resolve the customer, price and check the basket
//!    (read-only)
//! 2. Reserve inventory, render and upload the receipt, persist the sale
//!
//! If a second-phase step fails, the side effects already applied are
//! compensated in reverse order. The customer is notified last; a failed
//! notification does not fail the sale.

pub mod compensation;
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod services;
pub mod steps;

pub use compensation::{
    CompensationAction, CompensationFailure, CompensationLog, CompensationReport,
};
pub use error::{ErrorClass, ErrorKind, FulfillmentError, FulfillmentFailure};
pub use orchestrator::{
    FulfillmentOrchestrator, FulfillmentReceipt, NotificationOutcome, OrchestratorConfig,
};
pub use render::{
    DocumentRenderer, PdfReceiptRenderer, RenderError, RenderedDocument, TextReceiptRenderer,
};
pub use services::{
    ArtifactError, ArtifactStore, FileSystemArtifactStore, InMemoryArtifactStore, InMemoryNotifier,
    LogNotifier, Message, Notifier, NotifyError, StoredArtifact,
};
pub use steps::Step;
