use super::money::{Amount, Currency};
use super::{AdId, BookingId, UserId};
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const MAX_PARTICIPANTS: u32 = 20;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    PaymentFailed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    /// Whether the payment lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Confirmed)
                | (PendingPayment, PaymentFailed)
                | (PaymentFailed, PendingPayment)
                | (PaymentFailed, Confirmed)
                | (PendingPayment, Cancelled)
                | (PaymentFailed, Cancelled)
                | (Confirmed, Refunded)
        )
    }

    pub fn is_open(self) -> bool {
        matches!(self, BookingStatus::PendingPayment | BookingStatus::PaymentFailed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::PaymentFailed => "payment_failed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// A user's purchase of a supplier's offering for a date and time.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub ad_id: AdId,
    pub supplier_id: UserId,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub participants: u32,
    pub amount: Amount,
    pub currency: Currency,
    pub status: BookingStatus,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a user asks for when booking.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRequest {
    pub ad_id: AdId,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    pub participants: u32,
}

impl Booking {
    pub fn new(
        user_id: UserId,
        supplier_id: UserId,
        request: &BookingRequest,
        unit_price: Amount,
        currency: Currency,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !(1..=MAX_PARTICIPANTS).contains(&request.participants) {
            return Err(AppError::validation(format!(
                "Participants must be between 1 and {MAX_PARTICIPANTS}"
            )));
        }
        if request.date < now.date_naive() {
            return Err(AppError::validation("Booking date is in the past"));
        }
        let amount = unit_price.checked_mul(request.participants)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            ad_id: request.ad_id,
            supplier_id,
            date: request.date,
            time: request.time,
            participants: request.participants,
            amount,
            currency,
            status: BookingStatus::PendingPayment,
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn transition(&mut self, next: BookingStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Booking {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPayment,
    Succeeded,
    Failed,
    Cancelled,
    Refunded,
}

/// One payment attempt for a booking, keyed by the processor's intent id.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: BookingId,
    pub payment_intent_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(booking: &Booking, payment_intent_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            payment_intent_id,
            amount: booking.amount,
            currency: booking.currency.clone(),
            status: PaymentStatus::RequiresPayment,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: PaymentStatus, failure_reason: Option<String>, now: DateTime<Utc>) {
        self.status = status;
        self.failure_reason = failure_reason;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn request(date: NaiveDate, participants: u32) -> BookingRequest {
        BookingRequest {
            ad_id: Uuid::new_v4(),
            date,
            time: None,
            participants,
        }
    }

    fn booking(participants: u32) -> Result<Booking> {
        let now = Utc::now();
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &request(now.date_naive() + Duration::days(3), participants),
            Amount::new(dec!(30)).unwrap(),
            Currency::new("usd").unwrap(),
            now,
        )
    }

    #[test]
    fn test_booking_total() {
        let booking = booking(3).unwrap();
        assert_eq!(booking.amount.value(), dec!(90));
        assert_eq!(booking.status, BookingStatus::PendingPayment);
    }

    #[test]
    fn test_booking_participant_bounds() {
        assert!(booking(0).is_err());
        assert!(booking(MAX_PARTICIPANTS + 1).is_err());
    }

    #[test]
    fn test_booking_total_overflow_is_a_validation_error() {
        let now = Utc::now();
        let result = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &request(now.date_naive() + Duration::days(1), 2),
            Amount::new(rust_decimal::Decimal::MAX).unwrap(),
            Currency::new("usd").unwrap(),
            now,
        );
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_booking_rejects_past_dates() {
        let now = Utc::now();
        let result = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &request(now.date_naive() - Duration::days(1), 1),
            Amount::new(dec!(30)).unwrap(),
            Currency::new("usd").unwrap(),
            now,
        );
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let now = Utc::now();
        let mut booking = booking(1).unwrap();

        booking.transition(BookingStatus::PaymentFailed, now).unwrap();
        booking.transition(BookingStatus::PendingPayment, now).unwrap();
        booking.transition(BookingStatus::Confirmed, now).unwrap();

        assert!(matches!(
            booking.transition(BookingStatus::Cancelled, now),
            Err(AppError::Conflict(_))
        ));
        assert!(booking.transition(BookingStatus::Confirmed, now).is_err());

        booking.transition(BookingStatus::Refunded, now).unwrap();
        assert_eq!(booking.status, BookingStatus::Refunded);
    }
}
