use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::BookingId;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Stripe,
    Paypal,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "STRIPE",
            Self::Paypal => "PAYPAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "STRIPE" => Some(Self::Stripe),
            "PAYPAL" => Some(Self::Paypal),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Xaf,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Xaf => "XAF",
        }
    }

    /// Lowercase ISO code, the form the gateway wire format expects.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Xaf => "xaf",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            "XAF" => Some(Self::Xaf),
            _ => None,
        }
    }
}

/// A monetary transaction tied 1:1 to a booking and mediated by an external
/// provider. Never deleted; the paid/cancelled/refunded timestamps form the
/// audit trail and `version` detects lost-update races.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: Currency,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub purpose: Option<String>,
    pub method: Option<String>,
    pub reference: String,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_charge_id: Option<String>,
    pub paypal_order_id: Option<String>,
    pub paypal_capture_id: Option<String>,
    pub provider_message: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl Payment {
    /// Generate the human-readable reference carried on receipts:
    /// `PAY-` followed by 20 uppercase hex characters.
    pub fn generate_reference() -> String {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("PAY-{}", &hex[..20])
    }

    /// Apply a status transition. Each of the paid/cancelled/refunded
    /// timestamps is stamped on the first transition into that state and never
    /// re-stamped; the provider message is overwritten only when non-blank.
    pub fn apply_status(
        &mut self,
        status: PaymentStatus,
        provider_message: Option<&str>,
        now: DateTime<Utc>,
    ) {
        self.status = status;

        if let Some(message) = provider_message {
            if !message.trim().is_empty() {
                self.provider_message = Some(message.to_owned());
            }
        }

        match status {
            PaymentStatus::Succeeded if self.paid_at.is_none() => self.paid_at = Some(now),
            PaymentStatus::Cancelled if self.cancelled_at.is_none() => {
                self.cancelled_at = Some(now)
            }
            PaymentStatus::Refunded if self.refunded_at.is_none() => self.refunded_at = Some(now),
            _ => {}
        }

        self.updated_at = now;
    }
}

/// Payment creation request. `provider` defaults to Stripe when absent.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentRequest {
    pub booking_id: Option<BookingId>,
    pub user_id: Option<UserId>,
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub provider: Option<PaymentProvider>,
    pub purpose: Option<String>,
    pub method: Option<String>,
}
