//! Scriptable gateway double for service tests. Intents are held in memory;
//! tests pre-seed intent states and queue failures to drive the branches the
//! services take on provider answers.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{CreateIntent, GatewayError, IntentHandle, IntentState, ProviderGateway, RefundHandle};

#[derive(Default)]
pub struct MockGateway {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    counter: u64,
    states: HashMap<String, IntentState>,
    created: Vec<CreateIntent>,
    cancelled: Vec<String>,
    refunded: Vec<(String, Option<String>)>,
    fail_next: Option<String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a provider failure for the next gateway call.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.inner.lock().expect("mock gateway lock").fail_next = Some(message.into());
    }

    /// Pre-seed the state `retrieve_intent` will report for an intent id.
    pub fn set_intent_state(
        &self,
        intent_id: impl Into<String>,
        status: impl Into<String>,
        latest_charge_id: Option<&str>,
    ) {
        self.inner.lock().expect("mock gateway lock").states.insert(
            intent_id.into(),
            IntentState {
                status: status.into(),
                latest_charge_id: latest_charge_id.map(str::to_owned),
            },
        );
    }

    pub fn created_intents(&self) -> Vec<CreateIntent> {
        self.inner.lock().expect("mock gateway lock").created.clone()
    }

    pub fn cancelled_intents(&self) -> Vec<String> {
        self.inner.lock().expect("mock gateway lock").cancelled.clone()
    }

    /// Charge id and reason of every refund the services requested.
    pub fn refund_requests(&self) -> Vec<(String, Option<String>)> {
        self.inner.lock().expect("mock gateway lock").refunded.clone()
    }
}

impl Inner {
    fn take_failure(&mut self) -> Option<GatewayError> {
        self.fail_next.take().map(|message| GatewayError::Provider { message })
    }
}

#[async_trait]
impl ProviderGateway for MockGateway {
    async fn create_intent(&self, request: CreateIntent) -> Result<IntentHandle, GatewayError> {
        let mut inner = self.inner.lock().expect("mock gateway lock");
        if let Some(error) = inner.take_failure() {
            return Err(error);
        }

        inner.counter += 1;
        let intent_id = format!("pi_mock_{}", inner.counter);
        inner.created.push(request);
        inner.states.insert(
            intent_id.clone(),
            IntentState { status: "requires_payment_method".to_owned(), latest_charge_id: None },
        );

        Ok(IntentHandle {
            client_secret: Some(format!("{intent_id}_secret")),
            status: "requires_payment_method".to_owned(),
            intent_id,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentState, GatewayError> {
        let mut inner = self.inner.lock().expect("mock gateway lock");
        if let Some(error) = inner.take_failure() {
            return Err(error);
        }

        inner.states.get(intent_id).cloned().ok_or_else(|| GatewayError::Provider {
            message: format!("No such payment_intent: '{intent_id}'"),
        })
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<IntentState, GatewayError> {
        let mut inner = self.inner.lock().expect("mock gateway lock");
        if let Some(error) = inner.take_failure() {
            return Err(error);
        }

        let state = inner.states.get(intent_id).cloned().ok_or_else(|| {
            GatewayError::Provider { message: format!("No such payment_intent: '{intent_id}'") }
        })?;
        let cancelled =
            IntentState { status: "canceled".to_owned(), latest_charge_id: state.latest_charge_id };
        inner.states.insert(intent_id.to_owned(), cancelled.clone());
        inner.cancelled.push(intent_id.to_owned());
        Ok(cancelled)
    }

    async fn create_refund(
        &self,
        charge_id: &str,
        reason: Option<&str>,
    ) -> Result<RefundHandle, GatewayError> {
        let mut inner = self.inner.lock().expect("mock gateway lock");
        if let Some(error) = inner.take_failure() {
            return Err(error);
        }

        inner.refunded.push((charge_id.to_owned(), reason.map(str::to_owned)));
        let refund_id = format!("re_mock_{}", inner.refunded.len());
        Ok(RefundHandle { refund_id, status: "succeeded".to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use stayline_core::domain::payment::Currency;

    use super::MockGateway;
    use crate::{CreateIntent, GatewayError, ProviderGateway};

    fn request() -> CreateIntent {
        CreateIntent {
            amount_minor_units: 16_000,
            currency: Currency::Usd,
            description: Some("booking".to_owned()),
            metadata: vec![("reference".to_owned(), "PAY-ABC".to_owned())],
        }
    }

    #[tokio::test]
    async fn created_intents_are_recorded_and_retrievable() {
        let gateway = MockGateway::new();
        let handle = gateway.create_intent(request()).await.expect("create intent");
        assert!(handle.client_secret.is_some());

        let state = gateway.retrieve_intent(&handle.intent_id).await.expect("retrieve intent");
        assert_eq!(state.status, "requires_payment_method");
        assert_eq!(gateway.created_intents().len(), 1);
    }

    #[tokio::test]
    async fn scripted_failure_hits_the_next_call_only() {
        let gateway = MockGateway::new();
        gateway.fail_next("Your card was declined.");

        let error = gateway.create_intent(request()).await.expect_err("scripted failure");
        assert!(matches!(error, GatewayError::Provider { .. }));

        gateway.create_intent(request()).await.expect("subsequent call succeeds");
    }

    #[tokio::test]
    async fn cancel_flips_state_and_refund_is_recorded() {
        let gateway = MockGateway::new();
        let handle = gateway.create_intent(request()).await.expect("create intent");

        let cancelled = gateway.cancel_intent(&handle.intent_id).await.expect("cancel intent");
        assert_eq!(cancelled.status, "canceled");
        assert_eq!(gateway.cancelled_intents(), vec![handle.intent_id.clone()]);

        gateway.set_intent_state(&handle.intent_id, "succeeded", Some("ch_1"));
        let refund = gateway.create_refund("ch_1", Some("duplicate")).await.expect("refund");
        assert_eq!(refund.status, "succeeded");
        assert_eq!(
            gateway.refund_requests(),
            vec![("ch_1".to_owned(), Some("duplicate".to_owned()))]
        );
    }
}
