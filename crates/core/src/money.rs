//! Fixed-point currency arithmetic for booking totals and gateway amounts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::DomainError;

/// Convert a currency amount into the gateway's smallest unit (e.g. cents).
///
/// The amount is rounded half-up to two decimals first, so `10.005` charges
/// 1001 minor units. Non-positive amounts are rejected before any rounding.
pub fn to_minor_units(amount: Decimal) -> Result<i64, DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::InvariantViolation(
            "Amount must be greater than 0".to_owned(),
        ));
    }

    let scaled = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        * Decimal::from(100);

    scaled.trunc().to_i64().ok_or_else(|| {
        DomainError::InvariantViolation(format!("amount {amount} does not fit in minor units"))
    })
}

pub fn booking_subtotal(price_per_night: Decimal, nights: i32) -> Decimal {
    price_per_night * Decimal::from(nights)
}

pub fn booking_total(
    subtotal: Decimal,
    tax: Option<Decimal>,
    discount: Option<Decimal>,
) -> Decimal {
    subtotal + tax.unwrap_or(Decimal::ZERO) - discount.unwrap_or(Decimal::ZERO)
}
