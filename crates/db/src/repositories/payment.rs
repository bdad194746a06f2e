use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use stayline_core::domain::booking::BookingId;
use stayline_core::domain::payment::{
    Currency, Payment, PaymentId, PaymentProvider, PaymentStatus,
};
use stayline_core::domain::user::UserId;

use super::{parse_decimal, parse_opt_rfc3339, parse_rfc3339, parse_uuid, RepositoryError};
use crate::DbPool;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError>;
    async fn find_by_reference(&self, reference: &str)
        -> Result<Option<Payment>, RepositoryError>;
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, RepositoryError>;
    async fn list_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<Payment>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
    async fn exists_for_booking(&self, booking_id: &BookingId) -> Result<bool, RepositoryError>;

    /// Insert; the UNIQUE constraint on booking_id turns a second payment for
    /// the same booking into `RepositoryError::Conflict`.
    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError>;

    /// Optimistic-concurrency write. The UPDATE matches on the payment's
    /// current `version` and bumps it; zero affected rows means another writer
    /// got there first and yields `RepositoryError::Conflict`. The returned
    /// payment carries the bumped version.
    async fn update_versioned(&self, payment: &Payment) -> Result<Payment, RepositoryError>;
}

pub struct SqlPaymentRepository {
    pool: DbPool,
}

impl SqlPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PAYMENT_COLUMNS: &str = "\
    id, booking_id, user_id, amount, currency, provider, status, purpose, \
    method, reference, stripe_payment_intent_id, stripe_charge_id, \
    paypal_order_id, paypal_capture_id, provider_message, paid_at, \
    cancelled_at, refunded_at, created_at, updated_at, version";

#[async_trait]
impl PaymentRepository for SqlPaymentRepository {
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| payment_from_row(&value)).transpose()
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE reference = ?"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| payment_from_row(&value)).transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    async fn list_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(booking_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn exists_for_booking(&self, booking_id: &BookingId) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE booking_id = ?")
            .bind(booking_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, user_id, amount, currency, provider, status,
                purpose, method, reference, stripe_payment_intent_id,
                stripe_charge_id, paypal_order_id, paypal_capture_id,
                provider_message, paid_at, cancelled_at, refunded_at,
                created_at, updated_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(payment.booking_id.to_string())
        .bind(payment.user_id.to_string())
        .bind(payment.amount.to_string())
        .bind(payment.currency.as_str())
        .bind(payment.provider.as_str())
        .bind(payment.status.as_str())
        .bind(payment.purpose.as_deref())
        .bind(payment.method.as_deref())
        .bind(&payment.reference)
        .bind(payment.stripe_payment_intent_id.as_deref())
        .bind(payment.stripe_charge_id.as_deref())
        .bind(payment.paypal_order_id.as_deref())
        .bind(payment.paypal_capture_id.as_deref())
        .bind(payment.provider_message.as_deref())
        .bind(payment.paid_at.map(|ts| ts.to_rfc3339()))
        .bind(payment.cancelled_at.map(|ts| ts.to_rfc3339()))
        .bind(payment.refunded_at.map(|ts| ts.to_rfc3339()))
        .bind(payment.created_at.to_rfc3339())
        .bind(payment.updated_at.to_rfc3339())
        .bind(payment.version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RepositoryError::Conflict(format!(
                    "payment already exists for booking {}",
                    payment.booking_id
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_versioned(&self, payment: &Payment) -> Result<Payment, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                amount = ?, currency = ?, provider = ?, status = ?, purpose = ?,
                method = ?, stripe_payment_intent_id = ?, stripe_charge_id = ?,
                paypal_order_id = ?, paypal_capture_id = ?, provider_message = ?,
                paid_at = ?, cancelled_at = ?, refunded_at = ?, updated_at = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(payment.amount.to_string())
        .bind(payment.currency.as_str())
        .bind(payment.provider.as_str())
        .bind(payment.status.as_str())
        .bind(payment.purpose.as_deref())
        .bind(payment.method.as_deref())
        .bind(payment.stripe_payment_intent_id.as_deref())
        .bind(payment.stripe_charge_id.as_deref())
        .bind(payment.paypal_order_id.as_deref())
        .bind(payment.paypal_capture_id.as_deref())
        .bind(payment.provider_message.as_deref())
        .bind(payment.paid_at.map(|ts| ts.to_rfc3339()))
        .bind(payment.cancelled_at.map(|ts| ts.to_rfc3339()))
        .bind(payment.refunded_at.map(|ts| ts.to_rfc3339()))
        .bind(payment.updated_at.to_rfc3339())
        .bind(payment.id.to_string())
        .bind(payment.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Err(RepositoryError::Conflict(format!(
                "payment {} was modified concurrently",
                payment.id
            )));
        }

        let mut updated = payment.clone();
        updated.version += 1;
        Ok(updated)
    }
}

fn payment_from_row(row: &SqliteRow) -> Result<Payment, RepositoryError> {
    let currency_raw: String = row.try_get("currency")?;
    let currency = Currency::parse(&currency_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid payment currency: {currency_raw}"))
    })?;

    let provider_raw: String = row.try_get("provider")?;
    let provider = PaymentProvider::parse(&provider_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid payment provider: {provider_raw}"))
    })?;

    let status_raw: String = row.try_get("status")?;
    let status = PaymentStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid payment status: {status_raw}")))?;

    Ok(Payment {
        id: PaymentId(parse_uuid("payment", &row.try_get::<String, _>("id")?)?),
        booking_id: BookingId(parse_uuid(
            "payment booking",
            &row.try_get::<String, _>("booking_id")?,
        )?),
        user_id: UserId(parse_uuid("payment user", &row.try_get::<String, _>("user_id")?)?),
        amount: parse_decimal("payment amount", &row.try_get::<String, _>("amount")?)?,
        currency,
        provider,
        status,
        purpose: row.try_get("purpose")?,
        method: row.try_get("method")?,
        reference: row.try_get("reference")?,
        stripe_payment_intent_id: row.try_get("stripe_payment_intent_id")?,
        stripe_charge_id: row.try_get("stripe_charge_id")?,
        paypal_order_id: row.try_get("paypal_order_id")?,
        paypal_capture_id: row.try_get("paypal_capture_id")?,
        provider_message: row.try_get("provider_message")?,
        paid_at: parse_opt_rfc3339("payment paid_at", row.try_get("paid_at")?)?,
        cancelled_at: parse_opt_rfc3339("payment cancelled_at", row.try_get("cancelled_at")?)?,
        refunded_at: parse_opt_rfc3339("payment refunded_at", row.try_get("refunded_at")?)?,
        created_at: parse_rfc3339("payment created_at", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_rfc3339("payment updated_at", &row.try_get::<String, _>("updated_at")?)?,
        version: row.try_get("version")?,
    })
}
