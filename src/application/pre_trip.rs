use super::notify::{NoticeKind, NoticeSender};
use super::payments::PaymentAdapter;
use super::response::ActionResponse;
use crate::config::SettlementConfig;
use crate::domain::action::PreTripAction;
use crate::domain::audit::{AuditEvent, AuditMessage};
use crate::domain::booking::{Booking, PickupWindow, VerificationStatus};
use crate::domain::payment::GatewayStatus;
use crate::domain::ports::{SettlementCommit, SettlementStoreHandle};
use crate::error::{Result, SettlementError};
use chrono::Utc;
use tracing::{info, instrument, warn};

/// Approves or rejects a reservation that is waiting on verification.
pub struct PreTripResolver {
    store: SettlementStoreHandle,
    payments: PaymentAdapter,
    notices: NoticeSender,
    config: SettlementConfig,
}

impl PreTripResolver {
    pub fn new(
        store: SettlementStoreHandle,
        payments: PaymentAdapter,
        notices: NoticeSender,
        config: SettlementConfig,
    ) -> Self {
        Self {
            store,
            payments,
            notices,
            config,
        }
    }

    #[instrument(skip_all, fields(booking = %booking.id, action = action.name()))]
    pub async fn resolve(&self, booking: Booking, actor: &str, action: PreTripAction) -> Result<ActionResponse> {
        if booking.verification_status != VerificationStatus::Pending {
            return Err(SettlementError::VerificationAlreadyResolved {
                booking: booking.id,
                status: booking.verification_status,
            });
        }
        match action {
            PreTripAction::Approve { notes } => self.approve(booking, actor, notes).await,
            PreTripAction::Reject { notes } => self.reject(booking, actor, notes).await,
        }
    }

    async fn approve(&self, mut booking: Booking, actor: &str, notes: Option<String>) -> Result<ActionResponse> {
        let (capture, capture_error) = match booking.payment_intent_ref.as_deref() {
            Some(intent) => {
                let method = booking.payment_method.as_ref().map(|m| m.method_ref.as_str());
                match self.payments.capture(intent, method).await {
                    Ok(result) if result.status == GatewayStatus::Succeeded => (Some(result), None),
                    Ok(result) => {
                        let error = format!("capture of {} was not successful", result.id);
                        (Some(result), Some(error))
                    }
                    Err(e) => (None, Some(e.to_string())),
                }
            }
            None => (None, Some("no payment hold on file".to_string())),
        };
        if let Some(error) = &capture_error {
            warn!(booking = %booking.id, %error, "payment capture failed; approving anyway");
        }

        let now = Utc::now();
        booking.approve(
            PickupWindow::starting_at(now, self.config.pickup_window),
            capture_error.clone(),
        );
        booking.stamp_review(actor, now, notes.as_deref());

        let event = AuditEvent::BookingApproved {
            notes: notes.clone(),
            capture,
            capture_error,
        };
        let message = AuditMessage::new(booking.id, None, actor, now, event);
        let summary = message.summary.clone();
        self.store
            .commit(SettlementCommit::new(booking.clone(), message))
            .await?;
        info!(payment_status = ?booking.payment_status, "booking approved");

        self.notices
            .send(NoticeKind::Approved, &booking, &summary, None, notes.as_deref())
            .await;
        Ok(ActionResponse::new(true, summary, booking))
    }

    async fn reject(&self, mut booking: Booking, actor: &str, notes: Option<String>) -> Result<ActionResponse> {
        let (hold_released, release_error) = match booking.payment_intent_ref.as_deref() {
            Some(intent) => match self.payments.cancel(intent).await {
                Ok(()) => (true, None),
                Err(e) => {
                    warn!(booking = %booking.id, error = %e, "payment hold could not be released");
                    (false, Some(e.to_string()))
                }
            },
            None => (false, None),
        };

        let now = Utc::now();
        booking.reject();
        booking.stamp_review(actor, now, notes.as_deref());

        let event = AuditEvent::BookingRejected {
            notes: notes.clone(),
            hold_released,
            release_error,
        };
        let message = AuditMessage::new(booking.id, None, actor, now, event);
        let summary = message.summary.clone();
        self.store
            .commit(SettlementCommit::new(booking.clone(), message))
            .await?;
        info!(hold_released, "booking rejected");

        self.notices
            .send(NoticeKind::Rejected, &booking, &summary, None, notes.as_deref())
            .await;
        Ok(ActionResponse::new(true, summary, booking))
    }
}
