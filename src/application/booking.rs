use super::messages::MessageService;
use super::moderation::ensure_not_suspended;
use super::session::Actor;
use crate::domain::booking::{Booking, BookingRequest, BookingStatus, Payment, PaymentStatus};
use crate::domain::ports::{AdStoreRef, BookingStoreRef, IntentRequest, ModerationStoreRef, PaymentGatewayRef};
use crate::domain::{BookingId, UserId};
use crate::error::{AppError, Result};
use crate::infrastructure::payment_gateway::SimulatedGateway;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Marks a succeeded payment whose booking could not be confirmed.
pub const REFUND_REQUIRED: &str = "requires refund";

/// A payment processor webhook event, reduced to the fields reconciliation reads.
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventData {
    pub object: EventObject,
}

/// A payment intent, or a charge for `charge.refunded`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EventObject {
    pub id: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: EventMetadata,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EventMetadata {
    #[serde(default)]
    pub booking_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LastPaymentError {
    #[serde(default)]
    pub message: Option<String>,
}

impl PaymentEvent {
    fn intent_id(&self) -> &str {
        match (self.kind.as_str(), &self.data.object.payment_intent) {
            ("charge.refunded", Some(intent)) => intent,
            _ => &self.data.object.id,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Applied { booking_id: BookingId, status: BookingStatus },
    Duplicate,
    Ignored { reason: String },
}

impl ReconcileOutcome {
    fn ignored(reason: impl Into<String>) -> Self {
        ReconcileOutcome::Ignored { reason: reason.into() }
    }
}

/// What the client needs to confirm a card payment.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PaymentSession {
    pub booking_id: BookingId,
    pub payment_intent_id: String,
    pub client_secret: String,
}

/// Bookings of supplier offerings and their payment lifecycle.
#[derive(Clone)]
pub struct BookingService {
    bookings: BookingStoreRef,
    ads: AdStoreRef,
    moderation: ModerationStoreRef,
    messages: MessageService,
    gateway: PaymentGatewayRef,
    demo_gateway: PaymentGatewayRef,
}

impl BookingService {
    pub fn new(
        bookings: BookingStoreRef,
        ads: AdStoreRef,
        moderation: ModerationStoreRef,
        messages: MessageService,
        gateway: PaymentGatewayRef,
    ) -> Self {
        Self {
            bookings,
            ads,
            moderation,
            messages,
            gateway,
            demo_gateway: Arc::new(SimulatedGateway::new()),
        }
    }

    pub async fn create(&self, actor: &Actor, request: BookingRequest) -> Result<Booking> {
        let user_id = actor.require_user()?;
        ensure_not_suspended(&self.moderation, user_id).await?;

        let ad = self
            .ads
            .get(request.ad_id)
            .await?
            .filter(|ad| ad.active)
            .ok_or_else(|| AppError::not_found("ad", request.ad_id))?;

        let booking = Booking::new(user_id, ad.supplier_id, &request, ad.price, ad.currency, Utc::now())?;
        self.bookings.store_booking(booking.clone()).await?;
        info!(
            booking_id = %booking.id,
            user_id = %user_id,
            ad_id = %booking.ad_id,
            amount = %booking.amount,
            "booking created"
        );
        Ok(booking)
    }

    /// Creates a payment intent for an open booking. A failed booking is
    /// reopened, and any earlier unpaid attempt is cancelled.
    pub async fn start_payment(&self, actor: &Actor, booking_id: BookingId) -> Result<PaymentSession> {
        let user_id = actor.require_user()?;
        let mut booking = self.owned(user_id, booking_id).await?;
        if !booking.status.is_open() {
            return Err(AppError::conflict(format!(
                "Booking {booking_id} is {} and cannot be paid",
                booking.status
            )));
        }
        let now = Utc::now();
        if booking.status == BookingStatus::PaymentFailed {
            booking.transition(BookingStatus::PendingPayment, now)?;
        }

        let gateway = if actor.is_demo() {
            &self.demo_gateway
        } else {
            &self.gateway
        };
        let intent = gateway
            .create_intent(IntentRequest {
                amount: booking.amount.to_minor_units(&booking.currency)?,
                currency: booking.currency.clone(),
                booking_id,
            })
            .await?;

        self.cancel_open_payments(booking_id, "superseded").await?;
        self.bookings
            .store_payment(Payment::new(&booking, intent.payment_intent_id.clone(), now))
            .await?;
        booking.payment_intent_id = Some(intent.payment_intent_id.clone());
        booking.updated_at = now;
        self.bookings.store_booking(booking).await?;

        info!(booking_id = %booking_id, payment_intent_id = %intent.payment_intent_id, "payment started");
        Ok(PaymentSession {
            booking_id,
            payment_intent_id: intent.payment_intent_id,
            client_secret: intent.client_secret,
        })
    }

    pub async fn cancel(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        let user_id = actor.require_user()?;
        let mut booking = self.owned(user_id, booking_id).await?;
        booking.transition(BookingStatus::Cancelled, Utc::now())?;
        self.cancel_open_payments(booking_id, "booking cancelled").await?;
        self.bookings.store_booking(booking.clone()).await?;
        info!(booking_id = %booking_id, "booking cancelled");
        Ok(booking)
    }

    /// Applies one webhook event. Each event id is applied once: a replay is a
    /// `Duplicate`, and an event whose processing fails is released so the
    /// processor's retry is applied.
    pub async fn reconcile(&self, event: &PaymentEvent) -> Result<ReconcileOutcome> {
        if !self.bookings.record_event(&event.id).await? {
            info!(event_id = %event.id, "duplicate payment event");
            return Ok(ReconcileOutcome::Duplicate);
        }

        match self.apply_event(event).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(release) = self.bookings.forget_event(&event.id).await {
                    warn!(event_id = %event.id, error = %release, "failed to release payment event");
                }
                Err(e)
            }
        }
    }

    async fn apply_event(&self, event: &PaymentEvent) -> Result<ReconcileOutcome> {
        let (mut payment_status, mut booking_status) = match event.kind.as_str() {
            "payment_intent.succeeded" => (PaymentStatus::Succeeded, BookingStatus::Confirmed),
            "payment_intent.payment_failed" => (PaymentStatus::Failed, BookingStatus::PaymentFailed),
            "payment_intent.canceled" => (PaymentStatus::Cancelled, BookingStatus::Cancelled),
            "charge.refunded" => (PaymentStatus::Refunded, BookingStatus::Refunded),
            other => return Ok(ReconcileOutcome::ignored(format!("unhandled event type {other}"))),
        };

        let Some(mut payment) = self.find_payment(event).await? else {
            warn!(event_id = %event.id, payment_intent_id = %event.intent_id(), "payment event for unknown intent");
            return Ok(ReconcileOutcome::ignored("unknown payment intent"));
        };
        let Some(mut booking) = self.bookings.get_booking(payment.booking_id).await? else {
            warn!(event_id = %event.id, booking_id = %payment.booking_id, "payment without booking");
            return Ok(ReconcileOutcome::ignored("unknown booking"));
        };

        let object = &event.data.object;
        let mut failure_reason = None;
        match payment_status {
            PaymentStatus::Succeeded => {
                let expected = booking.amount.to_minor_units(&booking.currency)?;
                let currency_matches = object
                    .currency
                    .as_deref()
                    .is_none_or(|c| c.eq_ignore_ascii_case(booking.currency.as_str()));
                if object.amount != Some(expected) || !currency_matches {
                    warn!(
                        booking_id = %booking.id,
                        expected,
                        received = ?object.amount,
                        "payment amount mismatch"
                    );
                    payment_status = PaymentStatus::Failed;
                    booking_status = BookingStatus::PaymentFailed;
                    failure_reason = Some("amount mismatch".to_string());
                }
            }
            PaymentStatus::Failed => {
                failure_reason = Some(
                    object
                        .last_payment_error
                        .as_ref()
                        .and_then(|e| e.message.clone())
                        .unwrap_or_else(|| "payment failed".to_string()),
                );
            }
            _ => {}
        }

        let now = Utc::now();
        let live = booking.payment_intent_id.as_deref() == Some(payment.payment_intent_id.as_str());
        if !live && payment_status != PaymentStatus::Succeeded {
            payment.set_status(payment_status, failure_reason, now);
            self.bookings.store_payment(payment).await?;
            info!(event_id = %event.id, booking_id = %booking.id, "payment event for superseded intent");
            return Ok(ReconcileOutcome::ignored("superseded payment intent"));
        }

        // A retry after a partial write finds the booking already moved.
        let settled = live && booking.status == booking_status;
        if settled && payment.status == payment_status {
            return Ok(ReconcileOutcome::ignored(format!("booking already {booking_status}")));
        }
        if !settled && let Err(e) = booking.transition(booking_status, now) {
            warn!(event_id = %event.id, error = %e, "payment event does not apply");
            if payment_status == PaymentStatus::Succeeded {
                // Money was taken for a booking that can no longer be confirmed.
                payment.set_status(payment_status, Some(REFUND_REQUIRED.to_string()), now);
                self.bookings.store_payment(payment).await?;
                return Ok(ReconcileOutcome::ignored(format!("{e}, payment {REFUND_REQUIRED}")));
            }
            return Ok(ReconcileOutcome::ignored(e.to_string()));
        }
        if !live {
            // A late success on an earlier intent wins over the newer attempt.
            booking.payment_intent_id = Some(payment.payment_intent_id.clone());
            self.cancel_open_payments(booking.id, "superseded").await?;
        }
        payment.set_status(payment_status, failure_reason.clone(), now);
        self.bookings.store_payment(payment).await?;
        self.bookings.store_booking(booking.clone()).await?;

        if let Err(e) = self.notify(&booking, failure_reason.as_deref()).await {
            warn!(booking_id = %booking.id, error = %e, "failed to send booking notification");
        }
        info!(event_id = %event.id, booking_id = %booking.id, status = %booking.status, "payment event applied");
        Ok(ReconcileOutcome::Applied {
            booking_id: booking.id,
            status: booking.status,
        })
    }

    /// The actor's own bookings, newest first.
    pub async fn for_user(&self, actor: &Actor) -> Result<Vec<Booking>> {
        let user_id = actor.require_user()?;
        let mut bookings = self.bookings.bookings_for_user(user_id).await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    pub async fn get(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        let user_id = actor.require_user()?;
        let booking = self.find(booking_id).await?;
        if booking.user_id != user_id && booking.supplier_id != user_id && !actor.is_admin {
            return Err(AppError::forbidden("Not your booking"));
        }
        Ok(booking)
    }

    pub async fn payments(&self, actor: &Actor, booking_id: BookingId) -> Result<Vec<Payment>> {
        let booking = self.get(actor, booking_id).await?;
        let mut payments = self.bookings.payments_for_booking(booking.id).await?;
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(payments)
    }

    async fn find(&self, booking_id: BookingId) -> Result<Booking> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found("booking", booking_id))
    }

    async fn owned(&self, user_id: UserId, booking_id: BookingId) -> Result<Booking> {
        let booking = self.find(booking_id).await?;
        if booking.user_id != user_id {
            return Err(AppError::forbidden("Only the booking owner can do this"));
        }
        Ok(booking)
    }

    async fn find_payment(&self, event: &PaymentEvent) -> Result<Option<Payment>> {
        if let Some(payment) = self.bookings.payment_by_intent(event.intent_id()).await? {
            return Ok(Some(payment));
        }
        let Some(booking_id) = event
            .data
            .object
            .metadata
            .booking_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
        else {
            return Ok(None);
        };
        let latest = self
            .bookings
            .payments_for_booking(booking_id)
            .await?
            .into_iter()
            .max_by_key(|p| p.created_at);
        Ok(latest)
    }

    async fn cancel_open_payments(&self, booking_id: BookingId, reason: &str) -> Result<()> {
        let now = Utc::now();
        for mut payment in self
            .bookings
            .payments_for_booking(booking_id)
            .await?
            .into_iter()
            .filter(|p| p.status == PaymentStatus::RequiresPayment)
        {
            payment.set_status(PaymentStatus::Cancelled, Some(reason.to_string()), now);
            self.bookings.store_payment(payment).await?;
        }
        Ok(())
    }

    async fn notify(&self, booking: &Booking, failure_reason: Option<&str>) -> Result<()> {
        let title = match self.ads.get(booking.ad_id).await? {
            Some(ad) => ad.title,
            None => "your activity".to_string(),
        };
        let (subject, body) = match booking.status {
            BookingStatus::Confirmed => (
                "Booking confirmed",
                format!("Your booking for {title} on {} is confirmed.", booking.date),
            ),
            BookingStatus::PaymentFailed => (
                "Payment failed",
                format!(
                    "Payment for {title} on {} failed: {}. You can retry from your bookings.",
                    booking.date,
                    failure_reason.unwrap_or("unknown error")
                ),
            ),
            BookingStatus::Cancelled => (
                "Booking cancelled",
                format!("Your booking for {title} on {} was cancelled.", booking.date),
            ),
            BookingStatus::Refunded => (
                "Booking refunded",
                format!("Your booking for {title} on {} was refunded.", booking.date),
            ),
            BookingStatus::PendingPayment => return Ok(()),
        };
        self.messages.send_system(booking.user_id, subject, &body).await?;

        if booking.status == BookingStatus::Confirmed {
            let body = format!(
                "{} participant(s) booked {title} on {}.",
                booking.participants, booking.date
            );
            self.messages
                .send_system(booking.supplier_id, "New booking", &body)
                .await?;
        }
        Ok(())
    }
}
