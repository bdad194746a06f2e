//! Booking lifecycle manager: creation, the PENDING approval gate, partial
//! updates, dynamic search, and similarity recommendations.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use stayline_assist::TextGenerator;
use stayline_core::recommend::{self, Recommendation, FALLBACK_EXPLANATION};
use stayline_core::{
    AuthenticatedUser, Booking, BookingId, BookingSearch, BookingStatus, BookingUpdate,
    NewBooking, Page, PageRequest, ServiceError,
};
use stayline_db::repositories::{BookingRepository, UserRepository};

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    explainer: Arc<dyn TextGenerator>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        explainer: Arc<dyn TextGenerator>,
    ) -> Self {
        Self { bookings, users, explainer }
    }

    pub async fn create(
        &self,
        request: NewBooking,
        authenticated: &AuthenticatedUser,
    ) -> Result<Booking, ServiceError> {
        if authenticated.is_anonymous() {
            return Err(ServiceError::Unauthenticated(
                "authentication is required to create a booking".to_owned(),
            ));
        }
        let email = authenticated.email.as_deref().unwrap_or_default().trim().to_owned();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("no user found for email {email}")))?;

        validate_request(&request)?;

        let booking = Booking::from_request(request, user.id, Utc::now());
        self.bookings.insert(&booking).await?;
        info!(
            event_name = "booking.created",
            booking_id = %booking.id,
            user_id = %booking.user_id,
            total_amount = %booking.total_amount,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn approve(&self, id: &BookingId) -> Result<Booking, ServiceError> {
        let booking = self.require(id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(only_pending("approved", booking.status));
        }

        // The conditional update is the race-serializing write; losing it
        // means another caller transitioned the row first.
        if !self.bookings.mark_approved(id, Utc::now()).await? {
            let current = self.require(id).await?;
            return Err(only_pending("approved", current.status));
        }

        info!(event_name = "booking.approved", booking_id = %id, "booking approved");
        self.require(id).await
    }

    pub async fn reject(&self, id: &BookingId, reason: String) -> Result<Booking, ServiceError> {
        let booking = self.require(id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(only_pending("rejected", booking.status));
        }

        if !self.bookings.mark_rejected(id, &reason, Utc::now()).await? {
            let current = self.require(id).await?;
            return Err(only_pending("rejected", current.status));
        }

        info!(event_name = "booking.rejected", booking_id = %id, "booking rejected");
        self.require(id).await
    }

    pub async fn update(
        &self,
        id: &BookingId,
        update: BookingUpdate,
    ) -> Result<Booking, ServiceError> {
        let mut booking = self.require(id).await?;
        booking.apply_update(update, Utc::now());
        self.bookings.update(&booking).await?;
        Ok(booking)
    }

    pub async fn get(&self, id: &BookingId) -> Result<Booking, ServiceError> {
        self.require(id).await
    }

    pub async fn delete(&self, id: &BookingId) -> Result<(), ServiceError> {
        if !self.bookings.delete(id).await? {
            return Err(ServiceError::NotFound(format!("booking {id} not found")));
        }
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.bookings.list_all().await?)
    }

    pub async fn list_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.bookings.list_by_status(status).await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(self.bookings.count().await?)
    }

    pub async fn search(
        &self,
        criteria: BookingSearch,
        page: PageRequest,
    ) -> Result<Page<Booking>, ServiceError> {
        let column = BookingSearch::sort_column(&page.sort_by).ok_or_else(|| {
            ServiceError::BadRequest(format!("unsupported sort field `{}`", page.sort_by))
        })?;
        Ok(self.bookings.search(&criteria, &page, column).await?)
    }

    /// Rank approved bookings against the base one and attach a best-effort
    /// explanation. A failing generator never fails the recommendation.
    pub async fn recommend(
        &self,
        id: &BookingId,
        limit: usize,
    ) -> Result<Recommendation, ServiceError> {
        let base = self.require(id).await?;
        let candidates: Vec<Booking> = self
            .bookings
            .list_by_status(BookingStatus::Approved)
            .await?
            .into_iter()
            .filter(|candidate| candidate.id != base.id)
            .collect();

        let matches = recommend::rank(&base, candidates, limit);
        let summary = recommend::candidate_summary(&matches);
        let prompt = recommend::explanation_prompt(&base, &summary);

        let explanation = match self.explainer.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => FALLBACK_EXPLANATION.to_owned(),
            Err(error) => {
                warn!(
                    event_name = "booking.recommend.explainer_failed",
                    booking_id = %id,
                    error = %error,
                    "explanation generator failed, using fallback copy"
                );
                FALLBACK_EXPLANATION.to_owned()
            }
        };

        Ok(Recommendation { base, matches, explanation })
    }

    async fn require(&self, id: &BookingId) -> Result<Booking, ServiceError> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("booking {id} not found")))
    }
}

fn only_pending(action: &str, current: BookingStatus) -> ServiceError {
    ServiceError::invalid_state(
        format!("Only PENDING bookings can be {action}, current status: {current}"),
        current.to_string(),
    )
}

fn validate_request(request: &NewBooking) -> Result<(), ServiceError> {
    if request.name.trim().is_empty() {
        return Err(ServiceError::BadRequest("name must not be blank".to_owned()));
    }
    if request.region.trim().is_empty() {
        return Err(ServiceError::BadRequest("region must not be blank".to_owned()));
    }
    if request.country.trim().is_empty() {
        return Err(ServiceError::BadRequest("country must not be blank".to_owned()));
    }
    if request.number_of_nights < 1 {
        return Err(ServiceError::BadRequest(
            "number of nights must be at least 1".to_owned(),
        ));
    }
    if request.price_per_night <= Decimal::ZERO {
        return Err(ServiceError::BadRequest(
            "price per night must be greater than zero".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use stayline_assist::{FailingGenerator, StaticGenerator};
    use stayline_core::recommend::FALLBACK_EXPLANATION;
    use stayline_core::{
        AuthenticatedUser, BookingId, BookingSearch, BookingStatus, BookingUpdate, NewBooking,
        PageRequest, ServiceError, User, UserId,
    };
    use stayline_db::repositories::{
        InMemoryBookingRepository, InMemoryUserRepository, UserRepository,
    };

    use super::BookingService;

    fn request(name: &str, region: &str, nights: i32, price_cents: i64) -> NewBooking {
        NewBooking {
            name: name.to_owned(),
            image_url: None,
            description: None,
            region: region.to_owned(),
            country: "Cameroon".to_owned(),
            check_in_date: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
            check_out_date: Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap(),
            number_of_nights: nights,
            number_of_guests: Some(2),
            number_of_rooms: Some(1),
            max_guests: None,
            price_per_night: Decimal::new(price_cents, 2),
            tax_amount: Some(Decimal::new(1000, 2)),
            discount_amount: None,
            payment_method: None,
        }
    }

    async fn service_with_user() -> (BookingService, AuthenticatedUser) {
        let users = Arc::new(InMemoryUserRepository::default());
        users
            .insert(&User {
                id: UserId::new(),
                email: "guest@stayline.test".to_owned(),
                display_name: "Guest".to_owned(),
                role: "USER".to_owned(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed user");

        let service = BookingService::new(
            Arc::new(InMemoryBookingRepository::default()),
            users,
            Arc::new(StaticGenerator::new("because they are nearby")),
        );
        (service, AuthenticatedUser::known("guest@stayline.test"))
    }

    #[tokio::test]
    async fn create_derives_totals_and_starts_pending() {
        let (service, caller) = service_with_user().await;
        let booking =
            service.create(request("Sunrise", "Douala", 3, 5000), &caller).await.expect("create");

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.subtotal, Decimal::new(15_000, 2));
        assert_eq!(booking.total_amount, Decimal::new(16_000, 2));
        assert!(!booking.is_paid);
        assert!(!booking.is_cancelled);
    }

    #[tokio::test]
    async fn create_rejects_anonymous_callers() {
        let (service, _) = service_with_user().await;
        let error = service
            .create(request("Sunrise", "Douala", 3, 5000), &AuthenticatedUser::anonymous())
            .await
            .expect_err("anonymous");
        assert!(matches!(error, ServiceError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn create_requires_a_known_user() {
        let (service, _) = service_with_user().await;
        let error = service
            .create(
                request("Sunrise", "Douala", 3, 5000),
                &AuthenticatedUser::known("stranger@stayline.test"),
            )
            .await
            .expect_err("unknown email");
        assert!(matches!(error, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_validates_blank_fields_nights_and_price() {
        let (service, caller) = service_with_user().await;

        for bad in [
            request("   ", "Douala", 3, 5000),
            request("Sunrise", "  ", 3, 5000),
            request("Sunrise", "Douala", 0, 5000),
            request("Sunrise", "Douala", 3, 0),
            request("Sunrise", "Douala", 3, -5000),
        ] {
            let error = service.create(bad, &caller).await.expect_err("invalid request");
            assert!(matches!(error, ServiceError::BadRequest(_)));
        }
    }

    #[tokio::test]
    async fn approve_then_approve_again_reports_current_status() {
        let (service, caller) = service_with_user().await;
        let booking =
            service.create(request("Sunrise", "Douala", 3, 5000), &caller).await.expect("create");

        let approved = service.approve(&booking.id).await.expect("first approval");
        assert_eq!(approved.status, BookingStatus::Approved);

        let error = service.approve(&booking.id).await.expect_err("second approval");
        match error {
            ServiceError::InvalidState { message, current } => {
                assert_eq!(current, "APPROVED");
                assert_eq!(
                    message,
                    "Only PENDING bookings can be approved, current status: APPROVED"
                );
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reject_stamps_cancellation_and_blocks_later_approval() {
        let (service, caller) = service_with_user().await;
        let booking =
            service.create(request("Sunrise", "Douala", 3, 5000), &caller).await.expect("create");

        let rejected =
            service.reject(&booking.id, "overbooked".to_owned()).await.expect("reject");
        assert_eq!(rejected.status, BookingStatus::Rejected);
        assert!(rejected.is_cancelled);
        assert_eq!(rejected.cancellation_reason.as_deref(), Some("overbooked"));

        let error = service.approve(&booking.id).await.expect_err("rejected is terminal");
        assert!(matches!(error, ServiceError::InvalidState { ref current, .. } if current == "REJECTED"));
    }

    #[tokio::test]
    async fn approve_missing_booking_is_not_found() {
        let (service, _) = service_with_user().await;
        let error = service.approve(&BookingId::new()).await.expect_err("missing");
        assert!(matches!(error, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_merges_and_rederives_totals() {
        let (service, caller) = service_with_user().await;
        let booking =
            service.create(request("Sunrise", "Douala", 3, 5000), &caller).await.expect("create");

        let updated = service
            .update(
                &booking.id,
                BookingUpdate {
                    price_per_night: Some(Decimal::new(6000, 2)),
                    number_of_guests: Some(4),
                    ..BookingUpdate::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.number_of_guests, Some(4));
        assert_eq!(updated.subtotal, Decimal::new(18_000, 2));
        assert_eq!(updated.total_amount, Decimal::new(19_000, 2));
        assert_eq!(updated.region, booking.region, "untouched fields survive");
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (service, caller) = service_with_user().await;
        let booking =
            service.create(request("Sunrise", "Douala", 3, 5000), &caller).await.expect("create");

        service.delete(&booking.id).await.expect("delete");
        assert!(matches!(service.get(&booking.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(&booking.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn search_with_empty_criteria_returns_everything() {
        let (service, caller) = service_with_user().await;
        for name in ["A", "B", "C"] {
            service.create(request(name, "Douala", 3, 5000), &caller).await.expect("create");
        }

        let page = service
            .search(BookingSearch::default(), PageRequest::default())
            .await
            .expect("search");
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_elements, service.count().await.expect("count"));
    }

    #[tokio::test]
    async fn search_rejects_unknown_sort_fields() {
        let (service, _) = service_with_user().await;
        let error = service
            .search(
                BookingSearch::default(),
                PageRequest { sort_by: "drop table bookings".to_owned(), ..Default::default() },
            )
            .await
            .expect_err("unknown sort field");
        assert!(matches!(error, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn recommend_ranks_approved_candidates_and_uses_the_generator() {
        let (service, caller) = service_with_user().await;
        let base =
            service.create(request("Base", "Douala", 3, 5000), &caller).await.expect("create");
        let near =
            service.create(request("Near", "Douala", 3, 5200), &caller).await.expect("create");
        let far = service
            .create(request("Far", "Timbuktu", 9, 90_000), &caller)
            .await
            .expect("create");
        // Left pending on purpose; only approved bookings are candidates.
        let pending =
            service.create(request("Pending", "Douala", 3, 5000), &caller).await.expect("create");

        for id in [&near.id, &far.id] {
            service.approve(id).await.expect("approve candidate");
        }

        let recommendation = service.recommend(&base.id, 5).await.expect("recommend");
        assert_eq!(recommendation.base.id, base.id);
        assert_eq!(recommendation.matches.len(), 2);
        assert_eq!(recommendation.matches[0].booking.name, "Near");
        assert!(recommendation.matches[0].score > recommendation.matches[1].score);
        assert!(recommendation.matches.iter().all(|m| m.booking.id != pending.id));
        assert_eq!(recommendation.explanation, "because they are nearby");
    }

    #[tokio::test]
    async fn recommend_excludes_the_base_even_when_approved() {
        let (service, caller) = service_with_user().await;
        let base =
            service.create(request("Base", "Douala", 3, 5000), &caller).await.expect("create");
        service.approve(&base.id).await.expect("approve base");

        let recommendation = service.recommend(&base.id, 5).await.expect("recommend");
        assert!(recommendation.matches.is_empty());
    }

    #[tokio::test]
    async fn recommend_falls_back_when_the_generator_fails() {
        let users = Arc::new(InMemoryUserRepository::default());
        users
            .insert(&User {
                id: UserId::new(),
                email: "guest@stayline.test".to_owned(),
                display_name: "Guest".to_owned(),
                role: "USER".to_owned(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed user");
        let service = BookingService::new(
            Arc::new(InMemoryBookingRepository::default()),
            users,
            Arc::new(FailingGenerator),
        );
        let caller = AuthenticatedUser::known("guest@stayline.test");

        let base =
            service.create(request("Base", "Douala", 3, 5000), &caller).await.expect("create");
        let recommendation = service.recommend(&base.id, 3).await.expect("recommend");
        assert_eq!(recommendation.explanation, FALLBACK_EXPLANATION);
    }
}
