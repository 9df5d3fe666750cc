use crate::domain::ports::{IntentRequest, PaymentGateway, PaymentIntent};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Calls the serverless intent-creation endpoint that fronts the payment
/// processor. The endpoint holds the processor's secret key; this service
/// never sees it.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct IntentBody<'a> {
    amount: i64,
    currency: &'a str,
    metadata: IntentMetadata,
}

#[derive(Serialize)]
struct IntentMetadata {
    booking_id: String,
}

impl HttpPaymentGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(Box::new(e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent> {
        let body = IntentBody {
            amount: request.amount,
            currency: request.currency.as_str(),
            metadata: IntentMetadata {
                booking_id: request.booking_id.to_string(),
            },
        };

        debug!(booking_id = %request.booking_id, amount = request.amount, "creating payment intent");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PaymentError(format!("intent endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "intent endpoint rejected request");
            return Err(AppError::PaymentError(format!(
                "intent endpoint returned {status}: {text}"
            )));
        }

        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| AppError::PaymentError(format!("malformed intent response: {e}")))
    }
}

/// Stand-in processor for demo sessions and tests. Intent ids are unique and
/// the client secret follows the processor's `<id>_secret_<token>` shape.
#[derive(Clone, Default)]
pub struct SimulatedGateway;

impl SimulatedGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent> {
        let payment_intent_id = format!("pi_sim_{}", Uuid::new_v4().simple());
        let client_secret = format!("{payment_intent_id}_secret_{}", request.booking_id.simple());
        Ok(PaymentIntent {
            payment_intent_id,
            client_secret,
        })
    }
}
