//! Payment provider seam. Services talk to a [`ProviderGateway`] trait; the
//! Stripe adapter does the wire work and [`MockGateway`] scripts it in tests.

use async_trait::async_trait;
use thiserror::Error;

use stayline_core::domain::payment::Currency;
use stayline_core::errors::ServiceError;

pub mod mock;
pub mod stripe;

pub use mock::MockGateway;
pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider accepted the request but refused it, e.g. a declined card
    /// or an intent in a non-cancellable state.
    #[error("provider error: {message}")]
    Provider { message: String },
    /// The request never got a usable answer: connect failure, timeout, or an
    /// unparseable response body.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<GatewayError> for ServiceError {
    fn from(value: GatewayError) -> Self {
        ServiceError::Gateway(value.to_string())
    }
}

/// Request to open a payment intent with the provider. Amounts are integer
/// minor units; rounding happened upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateIntent {
    pub amount_minor_units: i64,
    pub currency: Currency,
    pub description: Option<String>,
    pub metadata: Vec<(String, String)>,
}

/// Provider-side handle returned on intent creation. The client secret goes
/// back to the caller so the frontend can confirm the payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentHandle {
    pub intent_id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

/// Snapshot of an intent as the provider currently sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentState {
    pub status: String,
    pub latest_charge_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundHandle {
    pub refund_id: String,
    pub status: String,
}

#[async_trait]
pub trait ProviderGateway: Send + Sync {
    async fn create_intent(&self, request: CreateIntent) -> Result<IntentHandle, GatewayError>;
    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentState, GatewayError>;
    async fn cancel_intent(&self, intent_id: &str) -> Result<IntentState, GatewayError>;
    /// Refunds a captured charge. Refunds target the charge, not the intent;
    /// the caller resolves which charge to return the money to.
    async fn create_refund(
        &self,
        charge_id: &str,
        reason: Option<&str>,
    ) -> Result<RefundHandle, GatewayError>;
}
