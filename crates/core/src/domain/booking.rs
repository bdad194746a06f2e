use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;
use crate::errors::DomainError;
use crate::money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub Uuid);

impl BookingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    MobileMoney,
    BankTransfer,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "CARD",
            Self::MobileMoney => "MOBILE_MONEY",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Cash => "CASH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CARD" => Some(Self::Card),
            "MOBILE_MONEY" => Some(Self::MobileMoney),
            "BANK_TRANSFER" => Some(Self::BankTransfer),
            "CASH" => Some(Self::Cash),
            _ => None,
        }
    }
}

/// A guest's reservation request for a stay, carrying pricing and date-range
/// data. `subtotal` and `total_amount` are derived, never accepted from the
/// caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub name: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub region: String,
    pub country: String,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    pub number_of_nights: i32,
    pub number_of_guests: Option<i32>,
    pub number_of_rooms: Option<i32>,
    pub max_guests: Option<i32>,
    pub price_per_night: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub total_amount: Decimal,
    pub payment_reference: Option<String>,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub payment_date: Option<DateTime<Utc>>,
    pub status: BookingStatus,
    pub is_cancelled: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Build a PENDING booking from a creation request, deriving totals.
    pub fn from_request(request: NewBooking, user_id: UserId, now: DateTime<Utc>) -> Self {
        let subtotal = money::booking_subtotal(request.price_per_night, request.number_of_nights);
        let total_amount =
            money::booking_total(subtotal, request.tax_amount, request.discount_amount);

        Self {
            id: BookingId::new(),
            name: request.name,
            image_url: request.image_url,
            description: request.description,
            region: request.region,
            country: request.country,
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
            number_of_nights: request.number_of_nights,
            number_of_guests: request.number_of_guests,
            number_of_rooms: request.number_of_rooms,
            max_guests: request.max_guests,
            price_per_night: request.price_per_night,
            subtotal,
            tax_amount: request.tax_amount,
            discount_amount: request.discount_amount,
            total_amount,
            payment_reference: None,
            payment_method: request.payment_method.unwrap_or(PaymentMethod::Card),
            is_paid: false,
            payment_date: None,
            status: BookingStatus::Pending,
            is_cancelled: false,
            cancelled_at: None,
            cancellation_reason: None,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require_pending(BookingStatus::Approved)?;
        self.status = BookingStatus::Approved;
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, reason: String, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.require_pending(BookingStatus::Rejected)?;
        self.status = BookingStatus::Rejected;
        self.is_cancelled = true;
        self.cancelled_at = Some(now);
        self.cancellation_reason = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    fn require_pending(&self, to: BookingStatus) -> Result<(), DomainError> {
        if self.status != BookingStatus::Pending {
            return Err(DomainError::InvalidTransition {
                entity: "booking",
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Null-safe merge: absent fields keep their current value. Pricing is
    /// re-derived when the nightly price changes.
    pub fn apply_update(&mut self, update: BookingUpdate, now: DateTime<Utc>) {
        if let Some(check_in) = update.check_in_date {
            self.check_in_date = check_in;
        }
        if let Some(check_out) = update.check_out_date {
            self.check_out_date = check_out;
        }
        if let Some(guests) = update.number_of_guests {
            self.number_of_guests = Some(guests);
        }
        if let Some(rooms) = update.number_of_rooms {
            self.number_of_rooms = Some(rooms);
        }
        if let Some(price) = update.price_per_night {
            self.price_per_night = price;
            self.subtotal = money::booking_subtotal(price, self.number_of_nights);
            self.total_amount =
                money::booking_total(self.subtotal, self.tax_amount, self.discount_amount);
        }
        // Admin escape hatch: a status sent through the generic update bypasses
        // the approve/reject transition checks and is applied verbatim.
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(reason) = update.cancellation_reason {
            self.cancellation_reason = Some(reason);
        }
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewBooking {
    pub name: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub region: String,
    pub country: String,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    pub number_of_nights: i32,
    pub number_of_guests: Option<i32>,
    pub number_of_rooms: Option<i32>,
    pub max_guests: Option<i32>,
    pub price_per_night: Decimal,
    pub tax_amount: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
}

/// Partial update; every field is optional and omitted fields never overwrite.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BookingUpdate {
    pub check_in_date: Option<DateTime<Utc>>,
    pub check_out_date: Option<DateTime<Utc>>,
    pub number_of_guests: Option<i32>,
    pub number_of_rooms: Option<i32>,
    pub price_per_night: Option<Decimal>,
    pub status: Option<BookingStatus>,
    pub cancellation_reason: Option<String>,
}
