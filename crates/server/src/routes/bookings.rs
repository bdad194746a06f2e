use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use stayline_core::recommend::Recommendation;
use stayline_core::{Booking, BookingId, BookingSearch, BookingStatus, BookingUpdate, NewBooking, Page};

use crate::http::{ApiError, ApiMessage, Caller, RequestMeta};
use crate::routes::{page_request, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-booking", post(create_booking))
        .route("/approve-booking/{id}", put(approve_booking))
        .route("/reject-booking/{id}", put(reject_booking))
        .route("/update-booking/{id}", put(update_booking))
        .route("/delete-booking/{id}", delete(delete_booking))
        .route("/search-bookings", post(search_bookings))
        .route("/recommend/{id}", get(recommend))
        .route("/all-bookings", get(all_bookings))
        .route("/fetch-approved-bookings", get(fetch_approved))
        .route("/fetch-rejected-bookings", get(fetch_rejected))
        .route("/fetch-booking/{id}", get(fetch_booking))
        .route("/total-bookings", get(total_bookings))
}

#[derive(Debug, Default, Deserialize)]
struct RejectBody {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(flatten)]
    criteria: BookingSearch,
    page: Option<u32>,
    size: Option<u32>,
    sort_by: Option<String>,
    direction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendQuery {
    limit: Option<usize>,
}

async fn create_booking(
    State(state): State<AppState>,
    meta: RequestMeta,
    Caller(authenticated): Caller,
    Json(request): Json<NewBooking>,
) -> Result<ApiMessage<Booking>, ApiError> {
    let booking =
        state.bookings.create(request, &authenticated).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::created("Booking created successfully", booking))
}

async fn approve_booking(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<Booking>, ApiError> {
    let booking = state.bookings.approve(&BookingId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Booking approved successfully", booking))
}

async fn reject_booking(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectBody>,
) -> Result<ApiMessage<Booking>, ApiError> {
    let reason = body.reason.unwrap_or_else(|| "Booking rejected".to_owned());
    let booking = state.bookings.reject(&BookingId(id), reason).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Booking rejected successfully", booking))
}

async fn update_booking(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(update): Json<BookingUpdate>,
) -> Result<ApiMessage<Booking>, ApiError> {
    let booking = state.bookings.update(&BookingId(id), update).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Booking updated successfully", booking))
}

async fn delete_booking(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<()>, ApiError> {
    state.bookings.delete(&BookingId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Booking deleted successfully", ()))
}

async fn search_bookings(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(body): Json<SearchBody>,
) -> Result<ApiMessage<Page<Booking>>, ApiError> {
    let page = page_request(body.page, body.size, body.sort_by, body.direction);
    let results =
        state.bookings.search(body.criteria, page).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Bookings retrieved successfully", results))
}

async fn recommend(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Query(query): Query<RecommendQuery>,
) -> Result<ApiMessage<Recommendation>, ApiError> {
    let recommendation = state
        .bookings
        .recommend(&BookingId(id), query.limit.unwrap_or(5))
        .await
        .map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Recommendations retrieved successfully", recommendation))
}

async fn all_bookings(
    State(state): State<AppState>,
    meta: RequestMeta,
) -> Result<ApiMessage<Vec<Booking>>, ApiError> {
    let bookings = state.bookings.list_all().await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Bookings retrieved successfully", bookings))
}

async fn fetch_approved(
    State(state): State<AppState>,
    meta: RequestMeta,
) -> Result<ApiMessage<Vec<Booking>>, ApiError> {
    let bookings = state
        .bookings
        .list_by_status(BookingStatus::Approved)
        .await
        .map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Approved bookings retrieved successfully", bookings))
}

async fn fetch_rejected(
    State(state): State<AppState>,
    meta: RequestMeta,
) -> Result<ApiMessage<Vec<Booking>>, ApiError> {
    let bookings = state
        .bookings
        .list_by_status(BookingStatus::Rejected)
        .await
        .map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Rejected bookings retrieved successfully", bookings))
}

async fn fetch_booking(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<Booking>, ApiError> {
    let booking = state.bookings.get(&BookingId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Booking retrieved successfully", booking))
}

async fn total_bookings(
    State(state): State<AppState>,
    meta: RequestMeta,
) -> Result<ApiMessage<u64>, ApiError> {
    let total = state.bookings.count().await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Total bookings retrieved successfully", total))
}
