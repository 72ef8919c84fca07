//! Sale fulfillment and lookup endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use common::{CustomerId, ProductId, SaleId};
use domain::{FulfillmentRequest, RequestedItem, Sale};
use fulfillment::{ArtifactStore, FulfillmentOrchestrator, Notifier};
use serde::{Deserialize, Serialize};
use store::{Catalog, InventoryLedger, SaleRecordStore};

use crate::error::ApiError;

/// The store capabilities the API needs.
pub trait SalesStore: Catalog + InventoryLedger + SaleRecordStore + 'static {}

impl<T: Catalog + InventoryLedger + SaleRecordStore + 'static> SalesStore for T {}

pub type Orchestrator<S> =
    FulfillmentOrchestrator<S, Arc<dyn ArtifactStore>, Arc<dyn Notifier>>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: SalesStore> {
    pub orchestrator: Orchestrator<S>,
    /// Environment label attached to request metrics.
    pub environment: String,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<SaleItemRequest>,
    #[serde(default)]
    pub payment_method: String,
    pub delivery_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct SaleCreatedResponse {
    pub status: &'static str,
    pub document_url: String,
    pub sale_id: String,
    pub folio: String,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct SaleResponse {
    pub id: String,
    pub folio: String,
    pub customer_id: String,
    pub customer_name: String,
    pub status: String,
    pub items: Vec<SaleItemResponse>,
    pub total_cents: i64,
    pub document_url: String,
    pub payment_method: String,
    pub delivery_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SaleItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&Sale> for SaleResponse {
    fn from(sale: &Sale) -> Self {
        let snapshot = sale.snapshot();
        Self {
            id: sale.id().to_string(),
            folio: sale.folio().to_string(),
            customer_id: sale.customer_id().to_string(),
            customer_name: snapshot.customer().name.clone(),
            status: sale.status().to_string(),
            items: sale
                .items()
                .iter()
                .map(|item| SaleItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.snapshot.name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.snapshot.unit_price.cents(),
                    subtotal_cents: item.subtotal().cents(),
                })
                .collect(),
            total_cents: sale.total().cents(),
            document_url: sale.document_url().to_string(),
            payment_method: snapshot.payment_method().to_string(),
            delivery_address: snapshot.delivery_address().map(str::to_string),
            created_at: snapshot.created_at(),
        }
    }
}

// -- Handlers --

/// POST /sales: fulfill a sale.
///
/// Any total sent by the client is ignored. A body that does not parse is a
/// 400 with the same error shape as any other invalid request.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: SalesStore>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateSaleRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let result = match payload {
        Ok(Json(req)) => fulfill(&state, req).await,
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    };
    let response = match result {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => err.into_response(),
    };

    record_request(&state.environment, started, response.status());
    response
}

async fn fulfill<S: SalesStore>(
    state: &AppState<S>,
    req: CreateSaleRequest,
) -> Result<SaleCreatedResponse, ApiError> {
    let customer_id = req
        .customer_id
        .as_deref()
        .map(parse_customer_id)
        .transpose()?;

    let request = FulfillmentRequest {
        customer_id,
        items: req
            .items
            .into_iter()
            .map(|item| RequestedItem::new(ProductId::new(item.product_id), item.quantity))
            .collect(),
        payment_method: req.payment_method,
        delivery_address: req.delivery_address,
    };

    let receipt = state.orchestrator.fulfill(request).await?;

    Ok(SaleCreatedResponse {
        status: "success",
        document_url: receipt.document_url().to_string(),
        sale_id: receipt.sale_id().to_string(),
        folio: receipt.folio().to_string(),
        total_cents: receipt.total().cents(),
    })
}

/// GET /sales/{id}: load a persisted sale.
#[tracing::instrument(skip(state))]
pub async fn get<S: SalesStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale_id = parse_sale_id(&id)?;
    let sale = state
        .orchestrator
        .store()
        .get(sale_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sale not found: {id}")))?;

    Ok(Json(SaleResponse::from(&sale)))
}

fn record_request(environment: &str, started: Instant, status: StatusCode) {
    let class = if status.is_success() {
        "2xx"
    } else if status.is_client_error() {
        "4xx"
    } else {
        "5xx"
    };

    metrics::histogram!("http_request_duration_seconds", "endpoint" => "/sales")
        .record(started.elapsed().as_secs_f64());
    metrics::counter!(
        "sales_requests_total",
        "status" => class,
        "environment" => environment.to_string()
    )
    .increment(1);
}

fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}

fn parse_sale_id(id: &str) -> Result<SaleId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid sale ID: {e}")))?;
    Ok(SaleId::from_uuid(uuid))
}
