use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use stayline_core::{BookingId, Payment, PaymentId, PaymentRequest, PaymentStatus, UserId};

use crate::http::{ApiError, ApiMessage, RequestMeta};
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/fetch-payment/{id}", get(fetch_payment))
        .route("/payment-reference/{reference}", get(fetch_by_reference))
        .route("/fetch-payment-by-userId/{id}", get(fetch_by_user))
        .route("/fetch-payment-by-bookingId/{id}", get(fetch_by_booking))
        .route("/update-payment-status/{id}", put(update_payment_status))
        .route("/cancel-payment/{id}", put(cancel_payment))
        .route("/refund-payment/{id}", put(refund_payment))
        .route("/all-payments", get(all_payments))
        .route("/total-payments", get(total_payments))
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: PaymentStatus,
    provider_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReasonBody {
    reason: Option<String>,
}

async fn create_payment_intent(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(request): Json<PaymentRequest>,
) -> Result<ApiMessage<Payment>, ApiError> {
    let payment = state.payments.create(request).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::created("Payment created successfully", payment))
}

async fn fetch_payment(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<Payment>, ApiError> {
    let payment = state.payments.get_by_id(&PaymentId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payment retrieved successfully", payment))
}

async fn fetch_by_reference(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(reference): Path<String>,
) -> Result<ApiMessage<Payment>, ApiError> {
    let payment = state.payments.get_by_reference(&reference).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payment retrieved successfully", payment))
}

async fn fetch_by_user(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<Vec<Payment>>, ApiError> {
    let payments = state.payments.list_by_user(&UserId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payments retrieved successfully", payments))
}

async fn fetch_by_booking(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<Vec<Payment>>, ApiError> {
    let payments =
        state.payments.list_by_booking(&BookingId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payments retrieved successfully", payments))
}

async fn update_payment_status(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<ApiMessage<Payment>, ApiError> {
    let payment = state
        .payments
        .update_status(&PaymentId(id), body.status, body.provider_message)
        .await
        .map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payment status updated successfully", payment))
}

async fn cancel_payment(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> Result<ApiMessage<Payment>, ApiError> {
    let payment =
        state.payments.cancel(&PaymentId(id), body.reason).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payment cancelled successfully", payment))
}

async fn refund_payment(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(body): Json<ReasonBody>,
) -> Result<ApiMessage<Payment>, ApiError> {
    let payment =
        state.payments.refund(&PaymentId(id), body.reason).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payment refunded successfully", payment))
}

async fn all_payments(
    State(state): State<AppState>,
    meta: RequestMeta,
) -> Result<ApiMessage<Vec<Payment>>, ApiError> {
    let payments = state.payments.list_all().await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Payments retrieved successfully", payments))
}

async fn total_payments(
    State(state): State<AppState>,
    meta: RequestMeta,
) -> Result<ApiMessage<u64>, ApiError> {
    let total = state.payments.count().await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Total payments retrieved successfully", total))
}
