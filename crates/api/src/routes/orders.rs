//! Order checkout, payment, and reconciliation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use checkout::{
    CheckoutError, CheckoutService, IdentityService, PaymentGateway, PaymentNotification,
    PaymentService, WebhookReconciler,
};
use common::OrderId;
use domain::{InvoiceId, Order, OrderStatus, UserId};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore, G: PaymentGateway> {
    pub checkout: CheckoutService<S>,
    pub payments: PaymentService<S, G>,
    pub reconciler: WebhookReconciler<S>,
    pub store: S,
    pub identity: Arc<dyn IdentityService>,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub order_id: OrderId,
}

/// Provider-defined notification schema; unknown extra fields are
/// ignored and `status` is a free-form string.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub invoice_id: String,
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_minor: i64,
    pub invoice_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_minor: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayResponse {
    pub order_id: String,
    pub payment_url: String,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub success: bool,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status(),
            total_minor: order.total().minor(),
            invoice_id: order.invoice_id().map(|i| i.to_string()),
            created_at: order.created_at(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    product_id: line.product_id.to_string(),
                    product_name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_price_minor: line.unit_price.minor(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders/create — convert the user's cart into a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.checkout.create_order(req.user_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/pay — request an invoice for a pending order.
#[tracing::instrument(skip(state, req))]
pub async fn pay<S: OrderStore + 'static, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<PayRequest>,
) -> Result<Json<PayResponse>, ApiError> {
    let redirect = state.payments.request_payment(req.order_id).await?;
    Ok(Json(PayResponse {
        order_id: redirect.order_id.to_string(),
        payment_url: redirect.payment_url,
    }))
}

/// POST /orders/webhook — apply an asynchronous payment notification.
///
/// Always acknowledges with 200: this is a delivery receipt, not a
/// business result. Reconciliation failures are logged; the provider
/// cannot act on them and must not be made to redeliver forever.
#[tracing::instrument(skip(state, req))]
pub async fn webhook<S: OrderStore + 'static, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<WebhookRequest>,
) -> Json<WebhookResponse> {
    let notification = PaymentNotification {
        invoice_id: InvoiceId::new(req.invoice_id),
        status: req.status,
    };

    match state.reconciler.reconcile(&notification).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "notification reconciled");
        }
        Err(CheckoutError::UnknownInvoice(invoice_id)) => {
            metrics::counter!("webhook_unknown_invoice_total").increment(1);
            tracing::warn!(%invoice_id, "notification for unknown invoice");
        }
        Err(error) => {
            tracing::error!(%error, "webhook reconciliation failed");
        }
    }

    Json(WebhookResponse { success: true })
}

/// GET /orders — administrative listing of all orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .store
        .list_all()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/my-history — the authenticated caller's orders.
#[tracing::instrument(skip(state, headers))]
pub async fn my_history<S: OrderStore + 'static, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let user_id = state
        .identity
        .authenticate(token)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("unknown token".to_string()))?;

    let orders = state
        .store
        .list_for_user(user_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}
