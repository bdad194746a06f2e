//! Stripe adapter speaking the form-encoded payment intents API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::{CreateIntent, GatewayError, IntentHandle, IntentState, ProviderGateway, RefundHandle};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeGateway {
    pub fn new(secret_key: SecretString, api_base: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_base: api_base.into(), secret_key }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(self.secret_key.expose_secret())
            .form(form)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        decode_response(response).await
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        decode_response(response).await
    }
}

#[async_trait]
impl ProviderGateway for StripeGateway {
    async fn create_intent(&self, request: CreateIntent) -> Result<IntentHandle, GatewayError> {
        let mut form = vec![
            ("amount".to_owned(), request.amount_minor_units.to_string()),
            ("currency".to_owned(), request.currency.code().to_owned()),
            ("automatic_payment_methods[enabled]".to_owned(), "true".to_owned()),
        ];
        if let Some(description) = request.description {
            form.push(("description".to_owned(), description));
        }
        for (key, value) in request.metadata {
            form.push((format!("metadata[{key}]"), value));
        }

        let body = self.post_form("/v1/payment_intents", &form).await?;
        let intent = intent_from_body(&body)?;
        debug!(intent_id = %intent.0, status = %intent.2, "created payment intent");

        Ok(IntentHandle {
            intent_id: intent.0,
            client_secret: string_field(&body, "client_secret"),
            status: intent.2,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentState, GatewayError> {
        let body = self.get(&format!("/v1/payment_intents/{intent_id}")).await?;
        let (_, latest_charge_id, status) = intent_from_body(&body)?;
        Ok(IntentState { status, latest_charge_id })
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<IntentState, GatewayError> {
        let body = self.post_form(&format!("/v1/payment_intents/{intent_id}/cancel"), &[]).await?;
        let (_, latest_charge_id, status) = intent_from_body(&body)?;
        Ok(IntentState { status, latest_charge_id })
    }

    async fn create_refund(
        &self,
        charge_id: &str,
        reason: Option<&str>,
    ) -> Result<RefundHandle, GatewayError> {
        let mut form = vec![("charge".to_owned(), charge_id.to_owned())];
        if let Some(reason) = reason {
            form.push(("metadata[reason]".to_owned(), reason.to_owned()));
        }
        let body = self.post_form("/v1/refunds", &form).await?;

        let refund_id = string_field(&body, "id").ok_or_else(|| {
            GatewayError::Transport("refund response missing `id`".to_owned())
        })?;
        let status = string_field(&body, "status").unwrap_or_else(|| "pending".to_owned());
        Ok(RefundHandle { refund_id, status })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn decode_response(response: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
    let status = response.status();
    let bytes =
        response.bytes().await.map_err(|err| GatewayError::Transport(err.to_string()))?;

    if status.is_success() {
        return serde_json::from_slice(&bytes)
            .map_err(|err| GatewayError::Transport(format!("invalid provider response: {err}")));
    }

    Err(provider_error(status.as_u16(), &bytes))
}

fn provider_error(status: u16, bytes: &[u8]) -> GatewayError {
    let message = serde_json::from_slice::<ErrorEnvelope>(bytes)
        .ok()
        .and_then(|envelope| envelope.error.message.or(envelope.error.kind))
        .unwrap_or_else(|| format!("provider returned HTTP {status}"));
    GatewayError::Provider { message }
}

fn string_field(body: &serde_json::Value, field: &str) -> Option<String> {
    body.get(field).and_then(|value| value.as_str()).map(str::to_owned)
}

fn intent_from_body(
    body: &serde_json::Value,
) -> Result<(String, Option<String>, String), GatewayError> {
    let id = string_field(body, "id")
        .ok_or_else(|| GatewayError::Transport("intent response missing `id`".to_owned()))?;
    let status = string_field(body, "status")
        .ok_or_else(|| GatewayError::Transport("intent response missing `status`".to_owned()))?;
    // `latest_charge` is a string id unless the caller asked for an expansion.
    let latest_charge_id = string_field(body, "latest_charge");
    Ok((id, latest_charge_id, status))
}
