//! Fulfillment orchestrator for sequencing the sale workflow.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{Money, ProductId, SaleId};
use domain::{
    Basket, CustomerSnapshot, FulfillmentRequest, LineItem, Product, Sale, SaleSnapshot,
    ValidatedRequest,
};
use serde::Serialize;
use store::{
    Catalog, InventoryLedger, ReservationFailure, ReservationItem, SaleRecordStore, StoreError,
};

use crate::compensation::{CompensationAction, CompensationLog, CompensationReport};
use crate::error::{ErrorClass, ErrorKind, FulfillmentError, FulfillmentFailure};
use crate::render::{DocumentRenderer, PdfReceiptRenderer, RenderedDocument};
use crate::services::artifacts::ArtifactStore;
use crate::services::notifier::{Message, Notifier};
use crate::steps::Step;

/// Tuning for the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Upper bound for every external call, compensation actions included.
    pub step_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn with_step_timeout(step_timeout: Duration) -> Self {
        Self { step_timeout }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(5),
        }
    }
}

/// Whether the purchase confirmation reached the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent,
    Failed(String),
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }
}

/// The result of a successful fulfillment.
#[derive(Debug, Clone)]
pub struct FulfillmentReceipt {
    pub sale: Sale,
    pub notification: NotificationOutcome,
}

impl FulfillmentReceipt {
    pub fn sale_id(&self) -> SaleId {
        self.sale.id()
    }

    pub fn folio(&self) -> &str {
        self.sale.folio().as_str()
    }

    pub fn document_url(&self) -> &str {
        self.sale.document_url()
    }

    pub fn total(&self) -> Money {
        self.sale.total()
    }

    pub fn items(&self) -> &[LineItem] {
        self.sale.items()
    }
}

/// Outcome of an external call bounded by the step timeout.
#[derive(Debug)]
enum Bounded<E> {
    Failed(E),
    TimedOut(Duration),
}

impl<E: fmt::Display> fmt::Display for Bounded<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bounded::Failed(e) => write!(f, "{e}"),
            Bounded::TimedOut(after) => write!(f, "timed out after {after:?}"),
        }
    }
}

/// Orchestrates the fulfillment of sales.
///
/// Runs in two phases. The first resolves the customer and prices and checks
/// the whole basket without touching anything. The second reserves stock,
/// renders and uploads the receipt, and persists the sale, recording an undo
/// action for every side effect. When a second-phase step fails, the recorded
/// actions run in reverse order before the failure is returned. Notification
/// comes last and cannot fail the sale.
pub struct FulfillmentOrchestrator<S, A, N, R = PdfReceiptRenderer> {
    store: S,
    artifacts: A,
    notifier: N,
    renderer: Arc<R>,
    config: OrchestratorConfig,
}

impl<S, A, N> FulfillmentOrchestrator<S, A, N>
where
    S: Catalog + InventoryLedger + SaleRecordStore,
    A: ArtifactStore,
    N: Notifier,
{
    /// Creates an orchestrator rendering PDF receipts.
    pub fn new(store: S, artifacts: A, notifier: N) -> Self {
        Self {
            store,
            artifacts,
            notifier,
            renderer: Arc::new(PdfReceiptRenderer),
            config: OrchestratorConfig::default(),
        }
    }
}

impl<S, A, N, R> FulfillmentOrchestrator<S, A, N, R>
where
    S: Catalog + InventoryLedger + SaleRecordStore,
    A: ArtifactStore,
    N: Notifier,
    R: DocumentRenderer + 'static,
{
    /// Replaces the document renderer.
    pub fn with_renderer<R2>(self, renderer: R2) -> FulfillmentOrchestrator<S, A, N, R2>
    where
        R2: DocumentRenderer + 'static,
    {
        FulfillmentOrchestrator {
            store: self.store,
            artifacts: self.artifacts,
            notifier: self.notifier,
            renderer: Arc::new(renderer),
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the store backing catalog, ledger and sale records.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Fulfills a sale request.
    ///
    /// On success the sale is persisted with a stored document and stock is
    /// decremented. On failure the returned error names the failing step and
    /// reports which compensating actions ran.
    #[tracing::instrument(skip(self, request), fields(sale_id = tracing::field::Empty))]
    pub async fn fulfill(
        &self,
        request: FulfillmentRequest,
    ) -> Result<FulfillmentReceipt, FulfillmentFailure> {
        metrics::counter!("fulfillment_executions_total").increment(1);
        let started = Instant::now();

        let sale_id = SaleId::new();
        tracing::Span::current().record("sale_id", tracing::field::display(sale_id));

        let result = self.run(sale_id, request).await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("fulfillment_duration_seconds").record(duration);

        match &result {
            Ok(receipt) => {
                metrics::counter!("fulfillment_completed_total").increment(1);
                tracing::info!(
                    folio = receipt.folio(),
                    total = %receipt.total(),
                    duration,
                    "fulfillment completed"
                );
            }
            Err(failure) => {
                let kind = failure.kind();
                metrics::counter!("fulfillment_failed_total", "kind" => kind.as_str())
                    .increment(1);
                match kind.class() {
                    ErrorClass::Client => tracing::info!(
                        step = failure.step.as_str(),
                        kind = kind.as_str(),
                        error = %failure.error,
                        "fulfillment rejected"
                    ),
                    ErrorClass::Server => tracing::error!(
                        step = failure.step.as_str(),
                        kind = kind.as_str(),
                        error = %failure.error,
                        compensation_failures = failure.compensation.failures.len(),
                        "fulfillment failed"
                    ),
                }
            }
        }

        result
    }

    async fn run(
        &self,
        sale_id: SaleId,
        request: FulfillmentRequest,
    ) -> Result<FulfillmentReceipt, FulfillmentFailure> {
        // Phase 1: read-only checks. Failures here return without compensation.
        tracing::info!(step = Step::ValidateRequest.as_str(), "fulfillment step started");
        let request = request
            .validate()
            .map_err(|e| FulfillmentFailure::without_side_effects(Step::ValidateRequest, e))?;

        tracing::info!(step = Step::ResolveCustomer.as_str(), "fulfillment step started");
        let customer = self
            .bounded(self.store.find_customer(request.customer_id))
            .await
            .map_err(|e| {
                FulfillmentFailure::without_side_effects(
                    Step::ResolveCustomer,
                    FulfillmentError::CatalogFailure(e.to_string()),
                )
            })?
            .ok_or_else(|| {
                FulfillmentFailure::without_side_effects(
                    Step::ResolveCustomer,
                    FulfillmentError::CustomerNotFound(request.customer_id),
                )
            })?;

        tracing::info!(step = Step::PriceBasket.as_str(), "fulfillment step started");
        let basket = self
            .price_basket(&request)
            .await
            .map_err(|e| FulfillmentFailure::without_side_effects(Step::PriceBasket, e))?;

        // Phase 2: side effects, each recorded for compensation.
        let mut compensation = CompensationLog::new();

        tracing::info!(step = Step::ReserveInventory.as_str(), "fulfillment step started");
        self.reserve(&basket, &mut compensation).await?;

        let snapshot = SaleSnapshot::new(
            sale_id,
            customer.id,
            CustomerSnapshot::from(&customer),
            basket.into_items(),
            request.payment_method,
            request.delivery_address,
            Utc::now(),
        );
        tracing::info!(folio = %snapshot.folio(), "folio assigned");

        tracing::info!(step = Step::RenderDocument.as_str(), "fulfillment step started");
        let document = match self.render(&snapshot).await {
            Ok(document) => document,
            Err(e) => return Err(self.abort(Step::RenderDocument, e, compensation).await),
        };

        tracing::info!(step = Step::UploadDocument.as_str(), "fulfillment step started");
        let key = format!("receipts/sale_{sale_id}.{}", document.extension);
        let uploaded = self
            .bounded(
                self.artifacts
                    .put(&key, document.bytes, &document.content_type),
            )
            .await;
        let locator = match uploaded {
            Ok(locator) => {
                compensation.record(CompensationAction::DeleteDocument { key });
                locator
            }
            Err(e) => {
                // A timed-out upload may still land.
                if matches!(e, Bounded::TimedOut(_)) {
                    compensation.record(CompensationAction::DeleteDocument { key });
                }
                let error = FulfillmentError::StorageFailure(e.to_string());
                return Err(self.abort(Step::UploadDocument, error, compensation).await);
            }
        };

        tracing::info!(step = Step::PersistSale.as_str(), "fulfillment step started");
        let sale = Sale::completed(snapshot, locator);
        self.persist(&sale, compensation).await?;

        tracing::info!(step = Step::NotifyCustomer.as_str(), "fulfillment step started");
        let notification = self.notify(&sale).await;

        Ok(FulfillmentReceipt { sale, notification })
    }

    /// Resolves and prices every line, checking stock against the combined
    /// demand per product. Touches nothing.
    async fn price_basket(&self, request: &ValidatedRequest) -> Result<Basket, FulfillmentError> {
        let mut basket = Basket::new();
        let mut resolved: HashMap<ProductId, Product> = HashMap::new();

        for item in &request.items {
            let product = match resolved.get(&item.product_id) {
                Some(product) => product.clone(),
                None => {
                    let product = self
                        .bounded(self.store.find_product(&item.product_id))
                        .await
                        .map_err(|e| FulfillmentError::CatalogFailure(e.to_string()))?
                        .ok_or_else(|| {
                            FulfillmentError::ProductNotFound(item.product_id.clone())
                        })?;
                    resolved.insert(item.product_id.clone(), product.clone());
                    product
                }
            };

            let demand = basket.add(&product, item.quantity)?;
            if !product.has_stock(demand) {
                return Err(FulfillmentError::InsufficientStock {
                    product_id: product.id,
                    requested: demand,
                    available: product.stock,
                });
            }
        }

        tracing::debug!(
            lines = basket.items().len(),
            total = %basket.total(),
            "basket priced"
        );
        Ok(basket)
    }

    async fn reserve(
        &self,
        basket: &Basket,
        compensation: &mut CompensationLog,
    ) -> Result<(), FulfillmentFailure> {
        let items: Vec<ReservationItem> = basket
            .demand()
            .map(|(product_id, quantity)| ReservationItem::new(product_id.clone(), quantity))
            .collect();

        let reserved = self.bounded(self.store.reserve(&items)).await;
        let error = match reserved {
            Ok(()) => {
                compensation.record(CompensationAction::ReleaseStock(items));
                return Ok(());
            }
            Err(Bounded::Failed(failure)) => {
                let nothing_applied = failure.nothing_applied();
                let ReservationFailure {
                    product_id,
                    applied,
                    cause,
                } = failure;
                if !nothing_applied {
                    compensation.record(CompensationAction::ReleaseStock(applied));
                }
                match cause {
                    // Stock moved since pricing; nothing to undo.
                    StoreError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                    } if nothing_applied => FulfillmentError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                    },
                    cause => {
                        FulfillmentError::PartialReservation(format!("at {product_id}: {cause}"))
                    }
                }
            }
            Err(Bounded::TimedOut(after)) => {
                let mut report = CompensationReport::default();
                report.record_unresolved(
                    "release_stock",
                    format!("reservation timed out after {after:?}; applied quantities unknown"),
                );
                return Err(FulfillmentFailure {
                    error: FulfillmentError::PartialReservation(format!(
                        "timed out after {after:?}"
                    )),
                    step: Step::ReserveInventory,
                    compensation: report,
                });
            }
        };

        Err(self
            .abort(Step::ReserveInventory, error, std::mem::take(compensation))
            .await)
    }

    async fn render(&self, snapshot: &SaleSnapshot) -> Result<RenderedDocument, FulfillmentError> {
        let renderer = Arc::clone(&self.renderer);
        let snapshot = snapshot.clone();
        let rendering = tokio::task::spawn_blocking(move || renderer.render(&snapshot));

        match tokio::time::timeout(self.config.step_timeout, rendering).await {
            Ok(Ok(Ok(document))) => Ok(document),
            Ok(Ok(Err(e))) => Err(FulfillmentError::RenderFailure(e.to_string())),
            Ok(Err(e)) => Err(FulfillmentError::RenderFailure(format!(
                "renderer task failed: {e}"
            ))),
            Err(_) => Err(FulfillmentError::RenderFailure(format!(
                "timed out after {:?}",
                self.config.step_timeout
            ))),
        }
    }

    async fn persist(
        &self,
        sale: &Sale,
        compensation: CompensationLog,
    ) -> Result<(), FulfillmentFailure> {
        let created = self.bounded(self.store.create(sale)).await;
        let error = match created {
            Ok(()) => return Ok(()),
            Err(Bounded::Failed(StoreError::DuplicateFolio(folio))) => {
                FulfillmentError::DuplicateFolio(folio)
            }
            Err(Bounded::Failed(e)) => FulfillmentError::PersistenceFailure(e.to_string()),
            Err(Bounded::TimedOut(after)) => {
                // The insert may have committed; look before undoing anything.
                let existing = self.bounded(self.store.get(sale.id())).await;
                match existing {
                    Ok(Some(_)) => {
                        tracing::warn!(
                            folio = %sale.folio(),
                            "sale persisted despite create timeout"
                        );
                        return Ok(());
                    }
                    Ok(None) => {
                        FulfillmentError::PersistenceFailure(format!("timed out after {after:?}"))
                    }
                    Err(e) => {
                        let error = FulfillmentError::PersistenceFailure(format!(
                            "timed out after {after:?}"
                        ));
                        let reason = format!("sale record state unknown: {e}");
                        return Err(FulfillmentFailure {
                            error,
                            step: Step::PersistSale,
                            compensation: compensation.abandon(&reason),
                        });
                    }
                }
            }
        };

        Err(self.abort(Step::PersistSale, error, compensation).await)
    }

    async fn notify(&self, sale: &Sale) -> NotificationOutcome {
        let message = Message::purchase_confirmation(sale);
        let sent = self
            .bounded(
                self.notifier
                    .send(&message.recipient, &message.subject, &message.body),
            )
            .await;

        match sent {
            Ok(()) => NotificationOutcome::Sent,
            Err(e) => {
                metrics::counter!("notification_failures_total").increment(1);
                tracing::warn!(
                    kind = ErrorKind::NotificationFailure.as_str(),
                    folio = %sale.folio(),
                    error = %e,
                    "notification failed; sale stays completed"
                );
                NotificationOutcome::Failed(e.to_string())
            }
        }
    }

    /// Runs compensation for a second-phase failure.
    async fn abort(
        &self,
        step: Step,
        error: FulfillmentError,
        compensation: CompensationLog,
    ) -> FulfillmentFailure {
        tracing::warn!(
            step = step.as_str(),
            kind = error.kind().as_str(),
            error = %error,
            pending = compensation.len(),
            "fulfillment step failed; compensating"
        );
        let report = compensation
            .unwind(&self.store, &self.artifacts, self.config.step_timeout)
            .await;
        FulfillmentFailure {
            error,
            step,
            compensation: report,
        }
    }

    async fn bounded<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, Bounded<E>> {
        match tokio::time::timeout(self.config.step_timeout, call).await {
            Ok(result) => result.map_err(Bounded::Failed),
            Err(_) => Err(Bounded::TimedOut(self.config.step_timeout)),
        }
    }
}
