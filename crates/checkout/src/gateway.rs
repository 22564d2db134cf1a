//! Payment gateway client.
//!
//! Builds invoice requests from an order and talks to the external
//! payment provider. The provider issues an invoice identifier and a
//! hosted payment page URL; the final outcome arrives later through the
//! webhook reconciler.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::{InvoiceId, Money, Order, ProductId};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the payment provider boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a usable response (network, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    ///
    /// Carries the provider's error payload verbatim for diagnostics.
    #[error("Gateway rejected the request: {status} - {body}")]
    Rejected { status: u16, body: String },

    /// The provider answered 2xx but the body was not a valid invoice.
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    /// The client could not be constructed from the given configuration.
    #[error("Gateway configuration error: {0}")]
    Config(String),
}

/// One basket line of an invoice request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketLine {
    pub name: String,
    pub quantity: u32,
    /// Unit price in minor units.
    pub unit_amount: Money,
    pub code: ProductId,
}

/// An invoice request derived from an order.
///
/// The merchant reference is the order's external identifier, not
/// anything issued by the provider (no provider id exists yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRequest {
    /// Total amount in minor units.
    pub amount: Money,
    /// Merchant correlation reference.
    pub reference: OrderId,
    /// Human-readable purpose line shown to the buyer.
    pub destination: String,
    pub basket: Vec<BasketLine>,
}

impl InvoiceRequest {
    /// Builds the invoice request for an order.
    pub fn for_order(order: &Order) -> Self {
        Self {
            amount: order.total(),
            reference: order.id(),
            destination: format!("Payment for order #{}", order.id()),
            basket: order
                .lines()
                .iter()
                .map(|line| BasketLine {
                    name: line.product_name.clone(),
                    quantity: line.quantity,
                    unit_amount: line.unit_price,
                    code: line.product_id.clone(),
                })
                .collect(),
        }
    }
}

/// A successfully created invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceReceipt {
    pub invoice_id: InvoiceId,
    /// Hosted payment page to redirect the buyer to.
    pub page_url: String,
}

/// Trait for payment provider implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates an invoice with the provider.
    async fn create_invoice(&self, request: &InvoiceRequest)
    -> Result<InvoiceReceipt, GatewayError>;
}

/// Injected configuration for the HTTP gateway client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Provider invoice-creation endpoint.
    pub endpoint: String,
    /// Shared-secret token sent in the `X-Token` header.
    pub token: SecretString,
    /// ISO 4217 numeric currency code (e.g. 980 for UAH).
    pub currency_code: u16,
    /// Where the provider sends the buyer after payment.
    pub redirect_url: String,
    /// Where the provider delivers asynchronous notifications.
    pub webhook_url: String,
    /// Bound on the outbound request.
    pub timeout: Duration,
}

// Wire types for the provider protocol.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInvoiceBody<'a> {
    amount: i64,
    ccy: u16,
    destination: &'a str,
    basket_order: Vec<WireBasketLine<'a>>,
    redirect_url: &'a str,
    web_hook_url: &'a str,
    reference: String,
}

#[derive(Serialize)]
struct WireBasketLine<'a> {
    name: &'a str,
    qty: u32,
    sum: i64,
    code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInvoiceResponse {
    invoice_id: Option<String>,
    page_url: Option<String>,
}

fn parse_receipt(value: serde_json::Value) -> Result<InvoiceReceipt, GatewayError> {
    let response: CreateInvoiceResponse = serde_json::from_value(value)
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

    match (response.invoice_id, response.page_url) {
        (Some(invoice_id), Some(page_url)) if !invoice_id.is_empty() => Ok(InvoiceReceipt {
            invoice_id: InvoiceId::new(invoice_id),
            page_url,
        }),
        _ => Err(GatewayError::MalformedResponse(
            "response missing invoiceId or pageUrl".to_string(),
        )),
    }
}

/// HTTP client for the payment provider's invoice API.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpPaymentGateway {
    /// Creates a new gateway client from injected configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Token",
            HeaderValue::from_str(config.token.expose_secret())
                .map_err(|e| GatewayError::Config(format!("invalid token: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self, request), fields(reference = %request.reference))]
    async fn create_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceReceipt, GatewayError> {
        let body = CreateInvoiceBody {
            amount: request.amount.minor(),
            ccy: self.config.currency_code,
            destination: &request.destination,
            basket_order: request
                .basket
                .iter()
                .map(|line| WireBasketLine {
                    name: &line.name,
                    qty: line.quantity,
                    sum: line.unit_amount.minor(),
                    code: line.code.as_str(),
                })
                .collect(),
            redirect_url: &self.config.redirect_url,
            web_hook_url: &self.config.webhook_url,
            reference: request.reference.to_string(),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "gateway rejected invoice request");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response.json().await?;
        parse_receipt(value)
    }
}

#[derive(Debug, Default)]
struct MockGatewayState {
    requests: Vec<InvoiceRequest>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing and local runs.
///
/// Issues sequential invoice identifiers and remembers every request.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<RwLock<MockGatewayState>>,
}

impl MockPaymentGateway {
    /// Creates a new mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to reject the next create calls.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of invoices created.
    pub fn invoice_count(&self) -> usize {
        self.state.read().unwrap().requests.len()
    }

    /// Returns the most recent invoice request, if any.
    pub fn last_request(&self) -> Option<InvoiceRequest> {
        self.state.read().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceReceipt, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Rejected {
                status: 500,
                body: "{\"errText\":\"invoice declined\"}".to_string(),
            });
        }

        state.next_id += 1;
        let invoice_id = InvoiceId::new(format!("INV-{:04}", state.next_id));
        state.requests.push(request.clone());

        Ok(InvoiceReceipt {
            page_url: format!("https://pay.example.com/{invoice_id}"),
            invoice_id,
        })
    }
}
