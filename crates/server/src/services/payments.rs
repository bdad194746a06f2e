//! Payment lifecycle manager. One payment per booking, provider work routed
//! through the gateway seam, and every remote step resolved to a deterministic
//! local state: a failed create leaves a persisted FAILED payment, a failed
//! cancel or refund leaves the local row untouched.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use stayline_core::{
    money, Booking, BookingId, Payment, PaymentId, PaymentProvider, PaymentRequest,
    PaymentStatus, ServiceError, UserId,
};
use stayline_db::repositories::{BookingRepository, PaymentRepository, UserRepository};
use stayline_gateway::{CreateIntent, ProviderGateway};

/// Stripe intent states that were never captured; a refund request against
/// one of these cancels the intent instead.
const UNCAPTURED_INTENT_STATUSES: [&str; 4] =
    ["requires_payment_method", "requires_confirmation", "requires_action", "processing"];

pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    gateway: Arc<dyn ProviderGateway>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        gateway: Arc<dyn ProviderGateway>,
    ) -> Self {
        Self { payments, bookings, users, gateway }
    }

    pub async fn create(&self, request: PaymentRequest) -> Result<Payment, ServiceError> {
        // All validation happens before any provider traffic.
        let booking_id = request
            .booking_id
            .ok_or_else(|| ServiceError::BadRequest("booking_id is required".to_owned()))?;
        let user_id = request
            .user_id
            .ok_or_else(|| ServiceError::BadRequest("user_id is required".to_owned()))?;
        let amount = request
            .amount
            .ok_or_else(|| ServiceError::BadRequest("amount is required".to_owned()))?;
        let currency = request
            .currency
            .ok_or_else(|| ServiceError::BadRequest("currency is required".to_owned()))?;
        if amount <= Decimal::ZERO {
            return Err(ServiceError::BadRequest("amount must be greater than zero".to_owned()));
        }

        let booking = self.bookings.find_by_id(&booking_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("booking {booking_id} not found"))
        })?;
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {user_id} not found")))?;
        if self.payments.exists_for_booking(&booking_id).await? {
            return Err(ServiceError::Conflict(format!(
                "a payment already exists for booking {booking_id}"
            )));
        }

        let provider = request.provider.unwrap_or(PaymentProvider::Stripe);
        let now = Utc::now();
        let mut payment = Payment {
            id: PaymentId::new(),
            booking_id,
            user_id: user.id,
            amount,
            currency,
            provider,
            status: PaymentStatus::Pending,
            purpose: request.purpose,
            method: request.method,
            reference: Payment::generate_reference(),
            stripe_payment_intent_id: None,
            stripe_charge_id: None,
            paypal_order_id: None,
            paypal_capture_id: None,
            provider_message: Some("Payment initialized".to_owned()),
            paid_at: None,
            cancelled_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.payments.insert(&payment).await?;
        info!(
            event_name = "payment.created",
            payment_id = %payment.id,
            booking_id = %booking_id,
            provider = %provider,
            reference = %payment.reference,
            "payment record created"
        );

        match provider {
            PaymentProvider::Stripe => self.open_stripe_intent(payment, &booking).await,
            PaymentProvider::Paypal => {
                payment.apply_status(
                    PaymentStatus::Pending,
                    Some("PayPal integration not implemented yet"),
                    Utc::now(),
                );
                Ok(self.payments.update_versioned(&payment).await?)
            }
        }
    }

    async fn open_stripe_intent(
        &self,
        mut payment: Payment,
        booking: &Booking,
    ) -> Result<Payment, ServiceError> {
        let amount_minor_units = money::to_minor_units(payment.amount)?;
        let intent = CreateIntent {
            amount_minor_units,
            currency: payment.currency,
            description: Some(format!("Booking payment for {}", booking.name)),
            metadata: vec![
                ("bookingId".to_owned(), payment.booking_id.to_string()),
                ("userId".to_owned(), payment.user_id.to_string()),
                ("paymentReference".to_owned(), payment.reference.clone()),
            ],
        };

        match self.gateway.create_intent(intent).await {
            Ok(handle) => {
                payment.stripe_payment_intent_id = Some(handle.intent_id);
                payment.apply_status(
                    PaymentStatus::Pending,
                    Some("Stripe PaymentIntent created"),
                    Utc::now(),
                );
                Ok(self.payments.update_versioned(&payment).await?)
            }
            Err(error) => {
                warn!(
                    event_name = "payment.intent_failed",
                    payment_id = %payment.id,
                    error = %error,
                    "provider rejected the payment intent"
                );
                payment.apply_status(PaymentStatus::Failed, Some(&error.to_string()), Utc::now());
                self.payments.update_versioned(&payment).await?;
                Err(error.into())
            }
        }
    }

    pub async fn update_status(
        &self,
        id: &PaymentId,
        status: PaymentStatus,
        provider_message: Option<String>,
    ) -> Result<Payment, ServiceError> {
        let mut payment = self.require(id).await?;
        payment.apply_status(status, provider_message.as_deref(), Utc::now());
        Ok(self.payments.update_versioned(&payment).await?)
    }

    pub async fn attach_provider_reference(
        &self,
        id: &PaymentId,
        provider: PaymentProvider,
        reference: &str,
    ) -> Result<Payment, ServiceError> {
        if reference.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "provider reference must not be blank".to_owned(),
            ));
        }
        let mut payment = self.require(id).await?;
        match provider {
            PaymentProvider::Stripe => {
                payment.stripe_payment_intent_id = Some(reference.trim().to_owned());
            }
            PaymentProvider::Paypal => {
                payment.paypal_order_id = Some(reference.trim().to_owned());
            }
        }
        payment.updated_at = Utc::now();
        Ok(self.payments.update_versioned(&payment).await?)
    }

    pub async fn cancel(
        &self,
        id: &PaymentId,
        reason: Option<String>,
    ) -> Result<Payment, ServiceError> {
        let mut payment = self.require(id).await?;
        if payment.status == PaymentStatus::Succeeded {
            return Err(ServiceError::invalid_state(
                "a SUCCEEDED payment cannot be cancelled, refund it instead",
                payment.status.to_string(),
            ));
        }

        if payment.provider == PaymentProvider::Stripe {
            let intent_id = payment.stripe_payment_intent_id.clone().ok_or_else(|| {
                ServiceError::BadRequest(
                    "payment has no Stripe PaymentIntent to cancel".to_owned(),
                )
            })?;
            // Gateway errors bubble up here, leaving the local row unchanged.
            self.gateway.retrieve_intent(&intent_id).await?;
            self.gateway.cancel_intent(&intent_id).await?;
        }

        let message = reason.unwrap_or_else(|| "Payment cancelled".to_owned());
        payment.apply_status(PaymentStatus::Cancelled, Some(&message), Utc::now());
        info!(event_name = "payment.cancelled", payment_id = %id, "payment cancelled");
        Ok(self.payments.update_versioned(&payment).await?)
    }

    pub async fn refund(
        &self,
        id: &PaymentId,
        reason: Option<String>,
    ) -> Result<Payment, ServiceError> {
        let mut payment = self.require(id).await?;
        if payment.status != PaymentStatus::Succeeded {
            return Err(ServiceError::invalid_state(
                format!("payment is {}, nothing to refund", payment.status),
                payment.status.to_string(),
            ));
        }

        if payment.provider != PaymentProvider::Stripe {
            let message = reason.unwrap_or_else(|| "Payment refunded".to_owned());
            payment.apply_status(PaymentStatus::Refunded, Some(&message), Utc::now());
            return Ok(self.payments.update_versioned(&payment).await?);
        }

        let intent_id = payment.stripe_payment_intent_id.clone().ok_or_else(|| {
            ServiceError::BadRequest("payment has no Stripe PaymentIntent to refund".to_owned())
        })?;
        let state = self.gateway.retrieve_intent(&intent_id).await?;

        if UNCAPTURED_INTENT_STATUSES.contains(&state.status.as_str()) {
            // Nothing was captured, so there is nothing to return; cancelling
            // the intent is the correct remote action.
            self.gateway.cancel_intent(&intent_id).await?;
            payment.apply_status(
                PaymentStatus::Cancelled,
                Some(&format!(
                    "Stripe PaymentIntent was {}, cancelled instead of refunded",
                    state.status
                )),
                Utc::now(),
            );
            return Ok(self.payments.update_versioned(&payment).await?);
        }

        if state.status != "succeeded" {
            return Err(ServiceError::BadRequest(format!(
                "Stripe PaymentIntent is {}, refusing to refund",
                state.status
            )));
        }

        // The recorded charge wins over whatever the intent currently points
        // at; `latest_charge` only backfills a payment that never stored one.
        let charge_id = match payment.stripe_charge_id.clone() {
            Some(charge) => charge,
            None => {
                let charge = state.latest_charge_id.clone().ok_or_else(|| {
                    ServiceError::BadRequest(
                        "no charge recorded for this payment, cannot refund".to_owned(),
                    )
                })?;
                payment.stripe_charge_id = Some(charge.clone());
                charge
            }
        };

        let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        let refund = self.gateway.create_refund(&charge_id, reason).await?;
        let message = match reason {
            Some(reason) => format!("Refund {} created: {reason}", refund.refund_id),
            None => format!("Refund {} created", refund.refund_id),
        };
        payment.apply_status(PaymentStatus::Refunded, Some(&message), Utc::now());
        info!(
            event_name = "payment.refunded",
            payment_id = %id,
            refund_id = %refund.refund_id,
            "payment refunded"
        );
        Ok(self.payments.update_versioned(&payment).await?)
    }

    pub async fn get_by_id(&self, id: &PaymentId) -> Result<Payment, ServiceError> {
        self.require(id).await
    }

    pub async fn get_by_reference(&self, reference: &str) -> Result<Payment, ServiceError> {
        self.payments.find_by_reference(reference).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("no payment found for reference {reference}"))
        })
    }

    pub async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, ServiceError> {
        Ok(self.payments.list_by_user(user_id).await?)
    }

    pub async fn list_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<Payment>, ServiceError> {
        Ok(self.payments.list_by_booking(booking_id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Payment>, ServiceError> {
        Ok(self.payments.list_all().await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(self.payments.count().await?)
    }

    async fn require(&self, id: &PaymentId) -> Result<Payment, ServiceError> {
        self.payments
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("payment {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use stayline_core::{
        Booking, NewBooking, PaymentProvider, PaymentRequest, PaymentStatus, ServiceError, User,
        UserId,
    };
    use stayline_db::repositories::{
        BookingRepository, InMemoryBookingRepository, InMemoryPaymentRepository,
        InMemoryUserRepository, PaymentRepository, UserRepository,
    };
    use stayline_gateway::MockGateway;

    use super::PaymentService;

    struct Harness {
        service: PaymentService,
        gateway: Arc<MockGateway>,
        payments: Arc<InMemoryPaymentRepository>,
        booking: Booking,
        user_id: UserId,
    }

    async fn harness() -> Harness {
        let bookings = Arc::new(InMemoryBookingRepository::default());
        let users = Arc::new(InMemoryUserRepository::default());
        let payments = Arc::new(InMemoryPaymentRepository::default());
        let gateway = Arc::new(MockGateway::new());

        let user = User {
            id: UserId::new(),
            email: "guest@stayline.test".to_owned(),
            display_name: "Guest".to_owned(),
            role: "USER".to_owned(),
            created_at: Utc::now(),
        };
        users.insert(&user).await.expect("seed user");

        let booking = Booking::from_request(
            NewBooking {
                name: "Sunrise Hostel".to_owned(),
                image_url: None,
                description: None,
                region: "Douala".to_owned(),
                country: "Cameroon".to_owned(),
                check_in_date: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
                check_out_date: Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap(),
                number_of_nights: 3,
                number_of_guests: Some(2),
                number_of_rooms: Some(1),
                max_guests: None,
                price_per_night: Decimal::new(5000, 2),
                tax_amount: Some(Decimal::new(1000, 2)),
                discount_amount: None,
                payment_method: None,
            },
            user.id,
            Utc::now(),
        );
        bookings.insert(&booking).await.expect("seed booking");

        let service = PaymentService::new(payments.clone(), bookings, users, gateway.clone());
        Harness { service, gateway, payments, booking, user_id: user.id }
    }

    fn request(h: &Harness) -> PaymentRequest {
        PaymentRequest {
            booking_id: Some(h.booking.id),
            user_id: Some(h.user_id),
            amount: Some(Decimal::new(16_000, 2)),
            currency: Some(stayline_core::Currency::Usd),
            provider: None,
            purpose: Some("Hostel booking".to_owned()),
            method: None,
        }
    }

    #[tokio::test]
    async fn create_defaults_to_stripe_and_opens_an_intent() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");

        assert_eq!(payment.provider, PaymentProvider::Stripe);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.reference.starts_with("PAY-"));
        assert_eq!(payment.provider_message.as_deref(), Some("Stripe PaymentIntent created"));
        assert!(payment.stripe_payment_intent_id.is_some());

        let intents = h.gateway.created_intents();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].amount_minor_units, 16_000);
        assert_eq!(
            intents[0].description.as_deref(),
            Some("Booking payment for Sunrise Hostel")
        );
        assert!(intents[0]
            .metadata
            .iter()
            .any(|(key, value)| key == "paymentReference" && value == &payment.reference));
    }

    #[tokio::test]
    async fn create_validates_presence_and_amount_before_touching_the_gateway() {
        let h = harness().await;

        let missing = PaymentRequest {
            booking_id: None,
            user_id: None,
            amount: None,
            currency: None,
            provider: None,
            purpose: None,
            method: None,
        };
        assert!(matches!(
            h.service.create(missing).await,
            Err(ServiceError::BadRequest(_))
        ));

        let negative = PaymentRequest {
            amount: Some(Decimal::new(-16_000, 2)),
            ..request(&h)
        };
        assert!(matches!(
            h.service.create(negative).await,
            Err(ServiceError::BadRequest(_))
        ));

        let zero = PaymentRequest { amount: Some(Decimal::ZERO), ..request(&h) };
        assert!(matches!(h.service.create(zero).await, Err(ServiceError::BadRequest(_))));

        assert!(h.gateway.created_intents().is_empty(), "no gateway call before validation");
    }

    #[tokio::test]
    async fn create_reports_missing_booking_and_user() {
        let h = harness().await;

        let unknown_booking = PaymentRequest {
            booking_id: Some(stayline_core::BookingId::new()),
            ..request(&h)
        };
        assert!(matches!(
            h.service.create(unknown_booking).await,
            Err(ServiceError::NotFound(_))
        ));

        let unknown_user = PaymentRequest { user_id: Some(UserId::new()), ..request(&h) };
        assert!(matches!(
            h.service.create(unknown_user).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn second_payment_for_the_same_booking_conflicts() {
        let h = harness().await;
        h.service.create(request(&h)).await.expect("first payment");

        let error = h.service.create(request(&h)).await.expect_err("duplicate");
        assert!(matches!(error, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn gateway_failure_on_create_persists_a_failed_payment() {
        let h = harness().await;
        h.gateway.fail_next("Your card was declined.");

        let error = h.service.create(request(&h)).await.expect_err("declined");
        assert!(matches!(error, ServiceError::Gateway(_)));

        let persisted = h.service.list_by_booking(&h.booking.id).await.expect("list");
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].status, PaymentStatus::Failed);
        assert!(persisted[0]
            .provider_message
            .as_deref()
            .is_some_and(|message| message.contains("declined")));
    }

    #[tokio::test]
    async fn paypal_payments_stay_pending_without_gateway_traffic() {
        let h = harness().await;
        let payment = h
            .service
            .create(PaymentRequest { provider: Some(PaymentProvider::Paypal), ..request(&h) })
            .await
            .expect("create");

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(
            payment.provider_message.as_deref(),
            Some("PayPal integration not implemented yet")
        );
        assert!(h.gateway.created_intents().is_empty());
    }

    #[tokio::test]
    async fn update_status_stamps_paid_at_exactly_once() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");

        let first = h
            .service
            .update_status(&payment.id, PaymentStatus::Succeeded, Some("confirmed".to_owned()))
            .await
            .expect("first transition");
        let stamped = first.paid_at.expect("paid_at stamped");

        let second = h
            .service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("second transition");
        assert_eq!(second.paid_at, Some(stamped));
        assert_eq!(second.provider_message.as_deref(), Some("confirmed"));
    }

    #[tokio::test]
    async fn attach_provider_reference_rejects_blanks_and_routes_by_provider() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");

        assert!(matches!(
            h.service
                .attach_provider_reference(&payment.id, PaymentProvider::Stripe, "   ")
                .await,
            Err(ServiceError::BadRequest(_))
        ));

        let updated = h
            .service
            .attach_provider_reference(&payment.id, PaymentProvider::Paypal, "PAYPAL-ORDER-7")
            .await
            .expect("attach");
        assert_eq!(updated.paypal_order_id.as_deref(), Some("PAYPAL-ORDER-7"));
    }

    #[tokio::test]
    async fn cancel_cancels_the_intent_and_stamps_cancelled_at() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");
        let intent_id = payment.stripe_payment_intent_id.clone().expect("intent id");

        let cancelled = h
            .service
            .cancel(&payment.id, Some("guest changed plans".to_owned()))
            .await
            .expect("cancel");

        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(cancelled.provider_message.as_deref(), Some("guest changed plans"));
        assert_eq!(h.gateway.cancelled_intents(), vec![intent_id]);
    }

    #[tokio::test]
    async fn cancel_refuses_succeeded_payments() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");
        h.service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("mark succeeded");

        let error = h.service.cancel(&payment.id, None).await.expect_err("succeeded");
        match error {
            ServiceError::InvalidState { message, current } => {
                assert!(message.contains("refund it instead"));
                assert_eq!(current, "SUCCEEDED");
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_without_an_intent_is_a_bad_request() {
        let h = harness().await;
        h.gateway.fail_next("Your card was declined.");
        // Failed create leaves no intent id behind.
        let _ = h.service.create(request(&h)).await;
        let persisted = h.service.list_by_booking(&h.booking.id).await.expect("list");
        let payment = &persisted[0];

        let error = h.service.cancel(&payment.id, None).await.expect_err("no intent");
        assert!(matches!(error, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn cancel_leaves_local_state_unchanged_when_the_gateway_fails() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");

        h.gateway.fail_next("intent lookup exploded");
        let error = h.service.cancel(&payment.id, None).await.expect_err("gateway failure");
        assert!(matches!(error, ServiceError::Gateway(_)));

        let reloaded = h.service.get_by_id(&payment.id).await.expect("reload");
        assert_eq!(reloaded.status, PaymentStatus::Pending);
        assert!(reloaded.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn refund_refuses_everything_but_succeeded() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");

        // PENDING
        let error = h.service.refund(&payment.id, None).await.expect_err("pending");
        assert!(matches!(
            error,
            ServiceError::InvalidState { ref message, .. } if message.contains("nothing to refund")
        ));

        // CANCELLED
        h.service.cancel(&payment.id, None).await.expect("cancel");
        let error = h.service.refund(&payment.id, None).await.expect_err("cancelled");
        assert!(matches!(error, ServiceError::InvalidState { ref current, .. } if current == "CANCELLED"));
    }

    #[tokio::test]
    async fn refund_of_an_uncaptured_intent_cancels_instead() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");
        let intent_id = payment.stripe_payment_intent_id.clone().expect("intent id");

        // Locally succeeded, but the provider still shows an uncaptured intent.
        h.service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("mark succeeded");
        h.gateway.set_intent_state(&intent_id, "requires_confirmation", None);

        let result = h.service.refund(&payment.id, None).await.expect("refund resolves");
        assert_eq!(result.status, PaymentStatus::Cancelled);
        assert!(result
            .provider_message
            .as_deref()
            .is_some_and(|message| message.contains("requires_confirmation")));
        assert_eq!(h.gateway.cancelled_intents(), vec![intent_id]);
        assert!(h.gateway.refund_requests().is_empty());
    }

    #[tokio::test]
    async fn refund_rejects_other_non_succeeded_intent_states() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");
        let intent_id = payment.stripe_payment_intent_id.clone().expect("intent id");

        h.service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("mark succeeded");
        h.gateway.set_intent_state(&intent_id, "canceled", None);

        let error = h.service.refund(&payment.id, None).await.expect_err("canceled remotely");
        assert!(matches!(
            error,
            ServiceError::BadRequest(ref message) if message.contains("canceled")
        ));
    }

    #[tokio::test]
    async fn refund_of_a_captured_intent_creates_a_refund() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");
        let intent_id = payment.stripe_payment_intent_id.clone().expect("intent id");

        h.service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("mark succeeded");
        h.gateway.set_intent_state(&intent_id, "succeeded", Some("ch_mock_1"));

        let refunded = h
            .service
            .refund(&payment.id, Some("double charge".to_owned()))
            .await
            .expect("refund");

        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert!(refunded.refunded_at.is_some());
        assert_eq!(refunded.stripe_charge_id.as_deref(), Some("ch_mock_1"));
        assert!(refunded
            .provider_message
            .as_deref()
            .is_some_and(|message| message.starts_with("Refund re_mock_")
                && message.contains("double charge")));
        assert_eq!(
            h.gateway.refund_requests(),
            vec![("ch_mock_1".to_owned(), Some("double charge".to_owned()))]
        );
    }

    #[tokio::test]
    async fn refund_targets_the_recorded_charge_over_the_latest_one() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");
        let intent_id = payment.stripe_payment_intent_id.clone().expect("intent id");

        // A webhook already recorded the captured charge; the intent has since
        // picked up a newer one.
        let mut succeeded = h
            .service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("mark succeeded");
        succeeded.stripe_charge_id = Some("ch_recorded".to_owned());
        h.payments.update_versioned(&succeeded).await.expect("store charge");
        h.gateway.set_intent_state(&intent_id, "succeeded", Some("ch_latest"));

        let refunded = h.service.refund(&payment.id, None).await.expect("refund");
        assert_eq!(refunded.stripe_charge_id.as_deref(), Some("ch_recorded"));
        assert_eq!(h.gateway.refund_requests(), vec![("ch_recorded".to_owned(), None)]);
    }

    #[tokio::test]
    async fn refund_without_any_charge_is_a_bad_request() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");
        let intent_id = payment.stripe_payment_intent_id.clone().expect("intent id");

        h.service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("mark succeeded");
        h.gateway.set_intent_state(&intent_id, "succeeded", None);

        let error = h.service.refund(&payment.id, None).await.expect_err("no charge");
        assert!(matches!(error, ServiceError::BadRequest(_)));
        assert!(h.gateway.refund_requests().is_empty());
    }

    #[tokio::test]
    async fn non_stripe_refunds_resolve_locally() {
        let h = harness().await;
        let payment = h
            .service
            .create(PaymentRequest { provider: Some(PaymentProvider::Paypal), ..request(&h) })
            .await
            .expect("create");
        h.service
            .update_status(&payment.id, PaymentStatus::Succeeded, None)
            .await
            .expect("mark succeeded");

        let refunded = h.service.refund(&payment.id, None).await.expect("refund");
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert!(h.gateway.refund_requests().is_empty());
    }

    #[tokio::test]
    async fn reads_cover_reference_user_and_booking_lookups() {
        let h = harness().await;
        let payment = h.service.create(request(&h)).await.expect("create");

        let by_reference =
            h.service.get_by_reference(&payment.reference).await.expect("by reference");
        assert_eq!(by_reference.id, payment.id);
        assert!(matches!(
            h.service.get_by_reference("PAY-DOESNOTEXIST").await,
            Err(ServiceError::NotFound(_))
        ));

        assert_eq!(h.service.list_by_user(&h.user_id).await.expect("by user").len(), 1);
        assert_eq!(
            h.service.list_by_booking(&h.booking.id).await.expect("by booking").len(),
            1
        );
        assert_eq!(h.service.count().await.expect("count"), 1);
        assert_eq!(h.service.list_all().await.expect("all").len(), 1);
    }
}
