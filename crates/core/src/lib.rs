pub mod config;
pub mod domain;
pub mod errors;
pub mod money;
pub mod recommend;
pub mod search;

pub use chrono;
pub use rust_decimal;

pub use domain::booking::{
    Booking, BookingId, BookingStatus, BookingUpdate, NewBooking, PaymentMethod,
};
pub use domain::employee::{Employee, EmployeeId, EmployeeUpdate, NewEmployee};
pub use domain::payment::{
    Currency, Payment, PaymentId, PaymentProvider, PaymentRequest, PaymentStatus,
};
pub use domain::user::{AuthenticatedUser, User, UserId};
pub use errors::{DomainError, ServiceError};
pub use recommend::{similarity_score, Recommendation, ScoredBooking, FALLBACK_EXPLANATION};
pub use search::{BookingSearch, EmployeeSearch, Page, PageRequest, SortDirection};
