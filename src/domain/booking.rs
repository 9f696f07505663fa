use super::money::Money;
use super::payment::PaymentMethod;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BookingId = Uuid;

/// Identity of the trusted admin acting on a booking.
pub type ActorId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingVerification,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
    PendingCharges,
    DisputeReview,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    PartialPaid,
    ChargesWaived,
    ChargesPaid,
    AdjustedPaid,
    PaymentFailed,
}

/// Time range in which the guest is expected to collect the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PickupWindow {
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start,
            end: start + length,
        }
    }
}

/// A reservation of a vehicle by a guest.
///
/// Bookings are never deleted; every status change goes through one of the
/// transition methods below, which also stamp the reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub guest_email: String,
    pub status: BookingStatus,
    pub verification_status: VerificationStatus,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub pickup_window: Option<PickupWindow>,
    /// Stored payment method used for post-trip charges.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Reference of the payment hold placed at reservation time.
    #[serde(default)]
    pub payment_intent_ref: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<ActorId>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pending_charges_amount: Option<Money>,
    #[serde(default)]
    pub charges_waived_amount: Option<Money>,
    #[serde(default)]
    pub last_payment_error: Option<String>,
}

impl Booking {
    pub fn new(id: BookingId, guest_email: impl Into<String>) -> Self {
        Self {
            id,
            guest_email: guest_email.into(),
            status: BookingStatus::PendingVerification,
            verification_status: VerificationStatus::Pending,
            payment_status: PaymentStatus::Pending,
            pickup_window: None,
            payment_method: None,
            payment_intent_ref: None,
            reviewed_by: None,
            reviewed_at: None,
            notes: None,
            pending_charges_amount: None,
            charges_waived_amount: None,
            last_payment_error: None,
        }
    }

    /// Whether the booking is waiting on a post-trip settlement decision.
    pub fn awaiting_settlement(&self) -> bool {
        matches!(
            self.verification_status,
            VerificationStatus::PendingCharges | VerificationStatus::DisputeReview
        )
    }

    pub fn stamp_review(&mut self, actor: &str, at: DateTime<Utc>, notes: Option<&str>) {
        self.reviewed_by = Some(actor.to_string());
        self.reviewed_at = Some(at);
        if let Some(notes) = notes {
            self.notes = Some(notes.to_string());
        }
    }

    /// Pre-trip approval. A failed capture leaves `paymentStatus=FAILED` but
    /// still confirms the booking.
    pub fn approve(&mut self, window: PickupWindow, capture_error: Option<String>) {
        self.verification_status = VerificationStatus::Approved;
        self.status = BookingStatus::Confirmed;
        self.pickup_window = Some(window);
        match capture_error {
            None => {
                self.payment_status = PaymentStatus::Paid;
                self.last_payment_error = None;
            }
            Some(error) => {
                self.payment_status = PaymentStatus::Failed;
                self.last_payment_error = Some(error);
            }
        }
    }

    pub fn reject(&mut self) {
        self.verification_status = VerificationStatus::Rejected;
        self.status = BookingStatus::Cancelled;
    }

    /// Closes the settlement with the given final payment status.
    pub fn complete_settlement(&mut self, payment_status: PaymentStatus) {
        self.status = BookingStatus::Completed;
        self.verification_status = VerificationStatus::Completed;
        self.payment_status = payment_status;
        self.pending_charges_amount = None;
        self.last_payment_error = None;
    }

    /// Records a failed settlement charge; the booking stays actionable.
    pub fn settlement_failed(&mut self, pending: Money, error: impl Into<String>) {
        self.payment_status = PaymentStatus::PaymentFailed;
        self.pending_charges_amount = Some(pending);
        self.last_payment_error = Some(error.into());
    }

    pub fn enter_dispute_review(&mut self) {
        self.verification_status = VerificationStatus::DisputeReview;
    }
}
