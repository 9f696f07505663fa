use crate::domain::booking::BookingId;
use crate::domain::charge::{AdjustmentRecord, ChargeId};
use crate::domain::money::{Money, Percentage};
use crate::domain::payment::{
    AdjustedCharge, CaptureResult, ChargeMetadata, ChargeResult, FeeCharge, GatewayError,
    IdempotencyKey, PaymentMethod, WaiverRequest, WaiverSplit,
};
use crate::domain::ports::PaymentGatewayHandle;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A charge against the booking's stored payment method.
#[derive(Debug, Clone)]
pub struct ChargeOrder<'a> {
    pub method: &'a PaymentMethod,
    pub amount: Money,
    pub description: String,
    pub booking_id: BookingId,
    pub charge_id: ChargeId,
    pub action: &'static str,
    pub idempotency_key: IdempotencyKey,
}

/// Wraps the gateway port with a bounded timeout and turns every gateway
/// failure into data.
///
/// Nothing above this layer ever sees a `GatewayError`; a timeout is reported
/// as a failed charge, never as a success.
#[derive(Clone)]
pub struct PaymentAdapter {
    gateway: PaymentGatewayHandle,
    timeout: Duration,
}

impl PaymentAdapter {
    pub fn new(gateway: PaymentGatewayHandle, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }

    pub async fn charge(&self, order: ChargeOrder<'_>) -> ChargeResult {
        let request = FeeCharge {
            customer_ref: order.method.customer_ref.clone(),
            method_ref: order.method.method_ref.clone(),
            amount_minor_units: order.amount.to_minor_units(),
            description: order.description,
            metadata: ChargeMetadata {
                booking_id: order.booking_id,
                charge_id: order.charge_id,
                action: order.action.to_string(),
            },
            idempotency_key: order.idempotency_key,
        };
        match self.bounded(self.gateway.charge_additional_fees(request)).await {
            Ok(charge) => ChargeResult::succeeded(
                Money::from_minor_units(charge.amount_minor_units),
                charge.charge_id,
            ),
            Err(e) => {
                warn!(booking = %order.booking_id, charge = %order.charge_id, error = %e, "gateway charge failed");
                ChargeResult::failed(order.amount, e)
            }
        }
    }

    pub async fn adjust_and_charge(
        &self,
        method: &PaymentMethod,
        record: &AdjustmentRecord,
        booking_id: BookingId,
        idempotency_key: IdempotencyKey,
    ) -> ChargeResult {
        let request = AdjustedCharge {
            customer_ref: method.customer_ref.clone(),
            method_ref: method.method_ref.clone(),
            record: record.clone(),
            booking_id,
            actor: record.adjusted_by.clone(),
            idempotency_key,
        };
        match self.bounded(self.gateway.adjust_and_charge(request)).await {
            Ok(charge) => ChargeResult::succeeded(
                Money::from_minor_units(charge.amount_minor_units),
                charge.charge_id,
            ),
            Err(e) => {
                warn!(booking = %booking_id, error = %e, "gateway adjusted charge failed");
                ChargeResult::failed(record.adjusted_total, e)
            }
        }
    }

    /// Records a waiver with the gateway's ledger.
    ///
    /// The split computed locally is authoritative; the gateway record is
    /// best-effort and a disagreement or failure is only logged.
    pub async fn record_waiver(
        &self,
        booking_id: BookingId,
        total: Money,
        percentage: Percentage,
        reason: &str,
        actor: &str,
    ) -> WaiverSplit {
        let (waived_amount, remaining_amount) = percentage.split(total);
        let local = WaiverSplit {
            waived_amount,
            remaining_amount,
        };
        let request = WaiverRequest {
            booking_id,
            total,
            percentage,
            reason: reason.to_string(),
            actor: actor.to_string(),
        };
        match self.bounded(self.gateway.waive_charges(request)).await {
            Ok(recorded) if recorded == local => {}
            Ok(recorded) => {
                warn!(booking = %booking_id, ?recorded, ?local, "gateway waiver split disagrees with ledger");
            }
            Err(e) => {
                warn!(booking = %booking_id, error = %e, "gateway waiver record failed");
            }
        }
        local
    }

    pub async fn capture(
        &self,
        payment_intent_ref: &str,
        method_ref: Option<&str>,
    ) -> Result<CaptureResult, GatewayError> {
        self.bounded(
            self.gateway
                .confirm_and_capture_payment(payment_intent_ref, method_ref),
        )
        .await
    }

    pub async fn cancel(&self, payment_intent_ref: &str) -> Result<(), GatewayError> {
        self.bounded(self.gateway.cancel_payment(payment_intent_ref))
            .await
    }
}
