use chrono::{DateTime, Utc};
use thiserror::Error;

use stayline_core::errors::ServiceError;

pub mod booking;
pub mod employee;
pub mod memory;
pub mod payment;
pub mod user;

pub use booking::{BookingRepository, SqlBookingRepository};
pub use employee::{EmployeeRepository, SqlEmployeeRepository};
pub use memory::{
    InMemoryBookingRepository, InMemoryEmployeeRepository, InMemoryPaymentRepository,
    InMemoryUserRepository,
};
pub use payment::{PaymentRepository, SqlPaymentRepository};
pub use user::{SqlUserRepository, UserRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => ServiceError::Conflict(message),
            other => ServiceError::Repository(other.to_string()),
        }
    }
}

pub(crate) fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

pub(crate) fn parse_opt_rfc3339(
    field: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.as_deref().map(|raw| parse_rfc3339(field, raw)).transpose()
}

pub(crate) fn parse_decimal(
    field: &str,
    value: &str,
) -> Result<rust_decimal::Decimal, RepositoryError> {
    value
        .parse()
        .map_err(|err| RepositoryError::Decode(format!("invalid {} decimal '{}': {}", field, value, err)))
}

pub(crate) fn parse_opt_decimal(
    field: &str,
    value: Option<String>,
) -> Result<Option<rust_decimal::Decimal>, RepositoryError> {
    value.as_deref().map(|raw| parse_decimal(field, raw)).transpose()
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<uuid::Uuid, RepositoryError> {
    value
        .parse()
        .map_err(|err| RepositoryError::Decode(format!("invalid {} id '{}': {}", field, value, err)))
}

pub(crate) fn parse_date(
    field: &str,
    value: &str,
) -> Result<chrono::NaiveDate, RepositoryError> {
    value
        .parse()
        .map_err(|err| RepositoryError::Decode(format!("invalid {} date '{}': {}", field, value, err)))
}
