//! Versioned HTTP surface. Route names mirror the public API contract
//! (`create-booking`, `fetch-payment/{id}`, ...) under `/api/{version}`.

use std::sync::Arc;

use axum::Router;

use stayline_core::{PageRequest, SortDirection};

use crate::services::{BookingService, EmployeeService, PaymentService};

pub mod bookings;
pub mod employees;
pub mod payments;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
    pub employees: Arc<EmployeeService>,
}

pub fn api_router(api_version: &str, state: AppState) -> Router {
    let api = Router::new()
        .nest("/bookings", bookings::router())
        .nest("/payments", payments::router())
        .nest("/employees", employees::router())
        .with_state(state);

    Router::new().nest(&format!("/api/{api_version}"), api)
}

/// Page settings from a request body; absent fields keep the defaults
/// (page 0, size 10, created_at descending).
pub(crate) fn page_request(
    page: Option<u32>,
    size: Option<u32>,
    sort_by: Option<String>,
    direction: Option<String>,
) -> PageRequest {
    let mut request = PageRequest::default();
    if let Some(page) = page {
        request.page = page;
    }
    if let Some(size) = size {
        request.size = size;
    }
    if let Some(sort_by) = sort_by {
        request.sort_by = sort_by;
    }
    if let Some(direction) = direction {
        request.direction = SortDirection::parse(&direction);
    }
    request
}
