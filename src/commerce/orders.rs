//! Order submission to the remote commerce API.
//!
//! Each submission is one (record, variant) pair: the payload carries a
//! single line item, the customer identity, billing and shipping addresses
//! populated identically from the record's single address, the record's
//! financial status verbatim, and flags requesting customer and fulfillment
//! receipts.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::commerce::CommerceClient;
use crate::error::AppError;
use crate::ingest::OrderRecord;

/// API path for order creation.
const ORDERS_PATH: &str = "/admin/orders.json";

/// Default per-submission timeout. The remote API provides no cancellation
/// for an in-flight call; this bound keeps the window barrier from hanging.
pub const DEFAULT_SUBMISSION_TIMEOUT: Duration = Duration::from_secs(30);

// ─────────────────────────────────────────────────────────────────────────────
// Payload Types
// ─────────────────────────────────────────────────────────────────────────────

/// Order-creation payload, serialized as `{"order": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    pub order: OrderBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBody {
    pub line_items: Vec<LineItem>,
    pub customer: CustomerBody,
    pub billing_address: AddressBody,
    pub shipping_address: AddressBody,
    /// Passed through verbatim from the ingested record.
    pub financial_status: String,
    pub send_receipt: bool,
    pub send_fulfillment_receipt: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineItem {
    pub variant_id: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerBody {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressBody {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub province: String,
    pub zip: String,
}

impl OrderPayload {
    /// Builds the payload for one record-variant submission.
    pub fn from_record(record: &OrderRecord, variant_id: u64) -> Self {
        let address = AddressBody {
            first_name: record.customer.first_name.clone(),
            last_name: record.customer.last_name.clone(),
            phone: record.customer.phone.clone(),
            address1: record.address.line1.clone(),
            address2: record.address.line2.clone(),
            city: record.address.city.clone(),
            province: record.address.region.clone(),
            zip: record.address.postal_code.clone(),
        };

        Self {
            order: OrderBody {
                line_items: vec![LineItem {
                    variant_id,
                    quantity: record.quantity,
                }],
                customer: CustomerBody {
                    first_name: record.customer.first_name.clone(),
                    last_name: record.customer.last_name.clone(),
                    phone: record.customer.phone.clone(),
                },
                billing_address: address.clone(),
                shipping_address: address,
                financial_status: record.payment_status.clone(),
                send_receipt: true,
                send_fulfillment_receipt: true,
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SubmitOrder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait seam for order submission, allowing test fakes.
///
/// The scheduler only depends on this trait; the real implementation is
/// [`OrderClient`].
pub trait SubmitOrder: Send + Sync {
    /// Submits one record-variant pair. Returns the remote order id on
    /// success.
    fn submit<'a>(
        &'a self,
        record: &'a OrderRecord,
        variant_id: u64,
    ) -> Pin<Box<dyn Future<Output = Result<u64, AppError>> + Send + 'a>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// OrderClient
// ─────────────────────────────────────────────────────────────────────────────

/// Real order submitter backed by the commerce HTTP client.
#[derive(Debug, Clone)]
pub struct OrderClient {
    client: CommerceClient,
    timeout: Duration,
}

impl OrderClient {
    pub fn new(client: CommerceClient) -> Self {
        Self {
            client,
            timeout: DEFAULT_SUBMISSION_TIMEOUT,
        }
    }

    /// Overrides the per-submission timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends one order-creation request and classifies the outcome.
    async fn submit_one(&self, record: &OrderRecord, variant_id: u64) -> Result<u64, AppError> {
        let payload = OrderPayload::from_record(record, variant_id);
        let body = serde_json::to_value(&payload)
            .map_err(|e| AppError::Internal(format!("Failed to encode order payload: {e}")))?;

        let send = self.client.post_json(ORDERS_PATH, &body);
        let response = bounded(self.timeout, send).await?;

        let status = response.status();
        if status == reqwest::StatusCode::CREATED {
            let created: CreatedOrderResponse =
                response
                    .json()
                    .await
                    .map_err(|e| AppError::OrderSubmissionFailed {
                        status: status.as_u16(),
                        body: format!("unreadable order response: {e}"),
                    })?;

            info!(
                "[ORDERS] Created order {} for variant {} on account {}",
                created.order.id,
                variant_id,
                self.client.account()
            );
            Ok(created.order.id)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::OrderSubmissionFailed {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Bounds one submission future, classifying expiry as a submission-local
/// failure. The window barrier waits on every submission, so each one must
/// resolve.
async fn bounded<T>(
    limit: Duration,
    send: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(limit, send).await {
        Ok(result) => result,
        Err(_) => Err(AppError::OrderSubmissionFailed {
            status: 0,
            body: format!("submission timed out after {limit:?}"),
        }),
    }
}

impl SubmitOrder for OrderClient {
    fn submit<'a>(
        &'a self,
        record: &'a OrderRecord,
        variant_id: u64,
    ) -> Pin<Box<dyn Future<Output = Result<u64, AppError>> + Send + 'a>> {
        Box::pin(self.submit_one(record, variant_id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct CreatedOrderResponse {
    order: CreatedOrder,
}

#[derive(Debug, serde::Deserialize)]
struct CreatedOrder {
    id: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
