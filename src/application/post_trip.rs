use super::executor::ChargeExecutor;
use super::notify::{NoticeKind, NoticeSender};
use super::payments::PaymentAdapter;
use super::response::ActionResponse;
use super::router::BookingContext;
use crate::domain::action::PostTripAction;
use crate::domain::audit::{AuditEvent, AuditMessage};
use crate::domain::booking::{Booking, PaymentStatus};
use crate::domain::charge::{AdjustmentRecord, ChargeAdjustment, ChargeStatus, TripCharge, WaiverRecord};
use crate::domain::dispute::Dispute;
use crate::domain::money::{Money, Percentage};
use crate::domain::ports::{ChargeStore, SettlementCommit, SettlementStoreHandle};
use crate::error::{Result, SettlementError};
use chrono::Utc;
use tracing::{info, instrument};

const NO_PAYMENT_METHOD: &str = "no payment method on file";

/// Settles the charges accrued on a finished trip.
///
/// Each call runs exactly one strategy against the booking's latest
/// unresolved trip charge. Preconditions are checked before anything is
/// written; after that every branch commits the booking, the trip charge and
/// one audit message together, and only a successful outcome notifies the
/// guest.
pub struct PostTripChargeResolver {
    store: SettlementStoreHandle,
    payments: PaymentAdapter,
    executor: ChargeExecutor,
    notices: NoticeSender,
}

impl PostTripChargeResolver {
    pub fn new(store: SettlementStoreHandle, payments: PaymentAdapter, notices: NoticeSender) -> Self {
        let executor = ChargeExecutor::new(store.clone(), payments.clone());
        Self {
            store,
            payments,
            executor,
            notices,
        }
    }

    #[instrument(skip_all, fields(booking = %context.booking.id, action = action.name()))]
    pub async fn resolve(
        &self,
        context: BookingContext,
        actor: &str,
        action: PostTripAction,
    ) -> Result<ActionResponse> {
        let BookingContext {
            booking,
            charge,
            open_disputes,
        } = context;

        let charge = charge
            .filter(|c| c.is_unresolved() && !c.total.is_zero())
            .ok_or(SettlementError::NoChargesToProcess(booking.id))?;

        match action {
            PostTripAction::ProcessCharges { notes } => {
                self.process_charges(booking, charge, actor, notes.as_deref()).await
            }
            PostTripAction::Waive { reason } => self.waive(booking, charge, actor, &reason).await,
            PostTripAction::PartialWaive { percentage, reason } => {
                self.partial_waive(booking, charge, actor, percentage, &reason)
                    .await
            }
            PostTripAction::Adjust { adjustments, notes } => {
                self.adjust(booking, charge, actor, adjustments, notes.as_deref())
                    .await
            }
            PostTripAction::ReviewDispute { notes } => {
                self.review_dispute(booking, charge, open_disputes, actor, notes.as_deref())
                    .await
            }
        }
    }

    async fn process_charges(
        &self,
        mut booking: Booking,
        mut charge: TripCharge,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<ActionResponse> {
        let method = booking
            .payment_method
            .clone()
            .ok_or(SettlementError::NoPaymentMethod(booking.id))?;
        let amount = charge.outstanding();

        let execution = self
            .executor
            .charge(
                &method,
                &charge,
                "process_charges",
                amount,
                format!("Trip charges for booking {}", booking.id),
            )
            .await?;
        let result = execution.result.clone();

        let now = Utc::now();
        booking.stamp_review(actor, now, notes);
        if result.is_success() {
            let (charge_status, payment_status) = settled_statuses(&charge);
            charge.record_charge_success(charge_status, result.charge_id.clone());
            booking.complete_settlement(payment_status);
        } else {
            charge.record_charge_failure(result.error_message());
            booking.settlement_failed(amount, result.error_message());
        }

        let event = AuditEvent::ChargesProcessed {
            amount,
            result: result.clone(),
        };
        let message = AuditMessage::new(booking.id, Some(charge.id), actor, now, event);
        let summary = message.summary.clone();
        self.store
            .commit(
                SettlementCommit::new(booking.clone(), message)
                    .with_charge(charge)
                    .with_intent(Some(execution.finalized_intent())),
            )
            .await?;
        info!(%amount, success = result.is_success(), "trip charges processed");

        if result.is_success() {
            self.notices
                .send(NoticeKind::ChargesProcessed, &booking, &summary, Some(amount), notes)
                .await;
        }
        Ok(ActionResponse::new(result.is_success(), summary, booking).with_charge_result(result))
    }

    /// Forgives the whole trip charge. Nothing has been collected on an
    /// unresolved charge, so the full total is what gets waived, whatever an
    /// earlier waiver or adjustment left outstanding.
    async fn waive(
        &self,
        mut booking: Booking,
        mut charge: TripCharge,
        actor: &str,
        reason: &str,
    ) -> Result<ActionResponse> {
        let forgiven = charge.total;
        self.payments
            .record_waiver(booking.id, forgiven, Percentage::FULL, reason, actor)
            .await;

        let now = Utc::now();
        charge.record_full_waiver(actor, reason, now);
        booking.stamp_review(actor, now, Some(reason));
        booking.complete_settlement(PaymentStatus::ChargesWaived);
        booking.charges_waived_amount = Some(forgiven);

        let event = AuditEvent::ChargesWaived {
            amount: forgiven,
            reason: reason.to_string(),
        };
        self.finish_waiver(booking, charge, actor, event, forgiven).await
    }

    async fn partial_waive(
        &self,
        mut booking: Booking,
        mut charge: TripCharge,
        actor: &str,
        percentage: Percentage,
        reason: &str,
    ) -> Result<ActionResponse> {
        if charge.waiver.is_some() {
            return Err(SettlementError::WaiverAlreadyRecorded(charge.id));
        }
        if charge.adjustment.is_some() {
            return Err(SettlementError::AdjustmentAlreadyRecorded(charge.id));
        }

        let (_, remaining) = percentage.split(charge.total);
        let reserved = match booking.payment_method.clone() {
            Some(method) if !remaining.is_zero() => {
                Some((method, self.executor.reserve(&charge, "partial_waive", remaining).await?))
            }
            _ => None,
        };

        let split = self
            .payments
            .record_waiver(booking.id, charge.total, percentage, reason, actor)
            .await;
        let (waived, remaining) = (split.waived_amount, split.remaining_amount);
        let now = Utc::now();

        if remaining.is_zero() {
            charge.record_full_waiver(actor, reason, now);
            booking.stamp_review(actor, now, Some(reason));
            booking.complete_settlement(PaymentStatus::ChargesWaived);
            booking.charges_waived_amount = Some(charge.total);
            let event = AuditEvent::ChargesPartiallyWaived {
                percentage,
                reason: reason.to_string(),
                waived_amount: waived,
                remaining_amount: remaining,
                remainder_result: None,
            };
            return self.finish_waiver(booking, charge, actor, event, waived).await;
        }

        // The waiver is persisted before the remainder is charged; a failed
        // charge below must never undo it.
        charge.record_partial_waiver(WaiverRecord {
            actor: actor.to_string(),
            reason: reason.to_string(),
            percentage,
            waived_amount: waived,
            remaining_amount: remaining,
            recorded_at: now,
        });
        self.store.store_charge(charge.clone()).await?;
        booking.charges_waived_amount = Some(waived);
        booking.stamp_review(actor, now, Some(reason));

        let (remainder_result, intent) = match reserved {
            Some((method, intent)) => {
                let execution = self
                    .executor
                    .execute(
                        &method,
                        &charge,
                        "partial_waive",
                        intent,
                        format!("Remaining trip charges for booking {}", booking.id),
                    )
                    .await;
                let intent = execution.finalized_intent();
                (Some(execution.result), Some(intent))
            }
            None => (None, None),
        };

        let success = remainder_result.as_ref().is_some_and(|r| r.is_success());
        match &remainder_result {
            Some(result) if result.is_success() => {
                charge.record_charge_success(ChargeStatus::PartialCharged, result.charge_id.clone());
                booking.complete_settlement(PaymentStatus::PartialPaid);
            }
            Some(result) => {
                charge.record_charge_failure(result.error_message());
                booking.settlement_failed(remaining, result.error_message());
            }
            None => {
                charge.failure_reason = Some(NO_PAYMENT_METHOD.to_string());
                booking.settlement_failed(remaining, NO_PAYMENT_METHOD);
            }
        }

        let event = AuditEvent::ChargesPartiallyWaived {
            percentage,
            reason: reason.to_string(),
            waived_amount: waived,
            remaining_amount: remaining,
            remainder_result: remainder_result.clone(),
        };
        let message = AuditMessage::new(booking.id, Some(charge.id), actor, now, event);
        let summary = message.summary.clone();
        self.store
            .commit(
                SettlementCommit::new(booking.clone(), message)
                    .with_charge(charge)
                    .with_intent(intent),
            )
            .await?;
        info!(%waived, %remaining, success, "trip charges partially waived");

        if success {
            self.notices
                .send(NoticeKind::ChargesWaived, &booking, &summary, Some(waived), Some(reason))
                .await;
        }

        let mut response = ActionResponse::new(success, summary, booking).with_waiver(waived, remaining);
        if let Some(result) = remainder_result {
            response = response.with_charge_result(result);
        }
        Ok(response)
    }

    async fn finish_waiver(
        &self,
        booking: Booking,
        charge: TripCharge,
        actor: &str,
        event: AuditEvent,
        waived: Money,
    ) -> Result<ActionResponse> {
        let message = AuditMessage::new(booking.id, Some(charge.id), actor, Utc::now(), event);
        let summary = message.summary.clone();
        let reason = charge.waiver.as_ref().map(|w| w.reason.clone());
        self.store
            .commit(SettlementCommit::new(booking.clone(), message).with_charge(charge))
            .await?;
        info!(%waived, "trip charges waived");

        self.notices
            .send(NoticeKind::ChargesWaived, &booking, &summary, Some(waived), reason.as_deref())
            .await;
        Ok(ActionResponse::new(true, summary, booking).with_waiver(waived, Money::ZERO))
    }

    async fn adjust(
        &self,
        mut booking: Booking,
        mut charge: TripCharge,
        actor: &str,
        adjustments: Vec<ChargeAdjustment>,
        notes: Option<&str>,
    ) -> Result<ActionResponse> {
        if charge.waiver.is_some() {
            return Err(SettlementError::WaiverAlreadyRecorded(charge.id));
        }
        let method = booking
            .payment_method
            .clone()
            .ok_or(SettlementError::NoPaymentMethod(booking.id))?;
        let now = Utc::now();
        let record = AdjustmentRecord::build(adjustments, &charge, actor, notes, now)?;

        let execution = self.executor.charge_adjusted(&method, &charge, &record).await?;
        let result = execution.result.clone();

        booking.stamp_review(actor, now, notes);
        charge.adjustment = Some(record.clone());
        if result.is_success() {
            charge.record_charge_success(ChargeStatus::AdjustedCharged, result.charge_id.clone());
            booking.complete_settlement(PaymentStatus::AdjustedPaid);
        } else {
            charge.record_charge_failure(result.error_message());
            booking.settlement_failed(record.adjusted_total, result.error_message());
        }

        let event = AuditEvent::ChargesAdjusted {
            record: record.clone(),
            result: result.clone(),
        };
        let message = AuditMessage::new(booking.id, Some(charge.id), actor, now, event);
        let summary = message.summary.clone();
        self.store
            .commit(
                SettlementCommit::new(booking.clone(), message)
                    .with_charge(charge)
                    .with_intent(Some(execution.finalized_intent())),
            )
            .await?;
        info!(
            original = %record.original_total,
            adjusted = %record.adjusted_total,
            success = result.is_success(),
            "trip charges adjusted"
        );

        if result.is_success() {
            self.notices
                .send(
                    NoticeKind::ChargesProcessed,
                    &booking,
                    &summary,
                    Some(record.adjusted_total),
                    notes,
                )
                .await;
        }
        Ok(ActionResponse::new(result.is_success(), summary, booking)
            .with_charge_result(result)
            .with_adjustment(record))
    }

    async fn review_dispute(
        &self,
        mut booking: Booking,
        mut charge: TripCharge,
        mut disputes: Vec<Dispute>,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<ActionResponse> {
        if disputes.is_empty() {
            return Err(SettlementError::NoOpenDisputes(booking.id));
        }

        let now = Utc::now();
        disputes.retain_mut(|d| d.begin_review(actor, now));
        booking.stamp_review(actor, now, notes);
        booking.enter_dispute_review();
        if matches!(charge.status, ChargeStatus::Pending | ChargeStatus::Failed) {
            charge.status = ChargeStatus::Disputed;
        }

        let event = AuditEvent::DisputeReviewStarted {
            notes: notes.map(str::to_string),
            disputes: disputes.iter().map(|d| d.id).collect(),
        };
        let message = AuditMessage::new(booking.id, Some(charge.id), actor, now, event);
        let summary = message.summary.clone();
        self.store
            .commit(
                SettlementCommit::new(booking.clone(), message)
                    .with_charge(charge)
                    .with_disputes(disputes),
            )
            .await?;
        info!("disputes moved under review");

        Ok(ActionResponse::new(true, summary, booking))
    }
}

/// Final statuses for a fully collected charge, given what was recorded on it.
fn settled_statuses(charge: &TripCharge) -> (ChargeStatus, PaymentStatus) {
    if charge.adjustment.is_some() {
        (ChargeStatus::AdjustedCharged, PaymentStatus::AdjustedPaid)
    } else if charge.waiver.is_some() {
        (ChargeStatus::PartialCharged, PaymentStatus::PartialPaid)
    } else {
        (ChargeStatus::Charged, PaymentStatus::ChargesPaid)
    }
}
