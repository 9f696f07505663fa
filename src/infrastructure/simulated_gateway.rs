use crate::domain::money::Money;
use crate::domain::payment::{
    AdjustedCharge, CaptureResult, FeeCharge, GatewayCharge, GatewayError, GatewayStatus,
    IdempotencyKey, WaiverRequest, WaiverSplit,
};
use crate::domain::ports::PaymentGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Method references starting with this prefix are declined.
pub const DECLINE_PREFIX: &str = "pm_decline";
/// Method references starting with this prefix never answer.
pub const HANG_PREFIX: &str = "pm_timeout";
/// Payment intents starting with this prefix fail capture and cancellation.
pub const FAILING_INTENT_PREFIX: &str = "pi_fail";

const HANG_FOR: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct Ledger {
    by_key: HashMap<IdempotencyKey, Result<GatewayCharge, GatewayError>>,
    charges: Vec<GatewayCharge>,
    waivers: Vec<WaiverRequest>,
    captured: Vec<String>,
    cancelled: Vec<String>,
}

/// A deterministic in-process payment gateway.
///
/// Behaviour is selected by reference prefixes (see the constants above) and
/// repeated submissions with the same idempotency key return the first
/// outcome without moving money again.
#[derive(Default, Clone)]
pub struct SimulatedGateway {
    ledger: Arc<RwLock<Ledger>>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful charges, in the order they were made.
    pub async fn charges(&self) -> Vec<GatewayCharge> {
        self.ledger.read().await.charges.clone()
    }

    pub async fn waivers(&self) -> Vec<WaiverRequest> {
        self.ledger.read().await.waivers.clone()
    }

    pub async fn captured(&self) -> Vec<String> {
        self.ledger.read().await.captured.clone()
    }

    pub async fn cancelled(&self) -> Vec<String> {
        self.ledger.read().await.cancelled.clone()
    }

    async fn submit(
        &self,
        key: &IdempotencyKey,
        method_ref: &str,
        amount_minor_units: i64,
    ) -> Result<GatewayCharge, GatewayError> {
        if let Some(previous) = self.ledger.read().await.by_key.get(key) {
            return previous.clone();
        }
        if method_ref.starts_with(HANG_PREFIX) {
            tokio::time::sleep(HANG_FOR).await;
        }

        let outcome = if method_ref.starts_with(DECLINE_PREFIX) {
            Err(GatewayError::Declined("card declined".to_string()))
        } else if amount_minor_units <= 0 {
            Err(GatewayError::Processor(format!(
                "invalid amount {amount_minor_units}"
            )))
        } else {
            Ok(GatewayCharge {
                charge_id: format!("ch_{}", Uuid::new_v4().simple()),
                amount_minor_units,
            })
        };

        let mut ledger = self.ledger.write().await;
        if let Some(previous) = ledger.by_key.get(key) {
            return previous.clone();
        }
        if let Ok(charge) = &outcome {
            ledger.charges.push(charge.clone());
        }
        ledger.by_key.insert(key.clone(), outcome.clone());
        outcome
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge_additional_fees(&self, charge: FeeCharge) -> Result<GatewayCharge, GatewayError> {
        self.submit(&charge.idempotency_key, &charge.method_ref, charge.amount_minor_units)
            .await
    }

    async fn waive_charges(&self, request: WaiverRequest) -> Result<WaiverSplit, GatewayError> {
        let (waived_amount, remaining_amount) = request.percentage.split(request.total);
        self.ledger.write().await.waivers.push(request);
        Ok(WaiverSplit {
            waived_amount,
            remaining_amount,
        })
    }

    async fn adjust_and_charge(&self, charge: AdjustedCharge) -> Result<GatewayCharge, GatewayError> {
        self.submit(
            &charge.idempotency_key,
            &charge.method_ref,
            charge.record.adjusted_total.to_minor_units(),
        )
        .await
    }

    async fn confirm_and_capture_payment(
        &self,
        payment_intent_ref: &str,
        _method_ref: Option<&str>,
    ) -> Result<CaptureResult, GatewayError> {
        if payment_intent_ref.starts_with(FAILING_INTENT_PREFIX) {
            return Err(GatewayError::Declined(format!(
                "payment intent {payment_intent_ref} could not be captured"
            )));
        }
        self.ledger
            .write()
            .await
            .captured
            .push(payment_intent_ref.to_string());
        Ok(CaptureResult {
            status: GatewayStatus::Succeeded,
            id: payment_intent_ref.to_string(),
            amount: Money::ZERO,
        })
    }

    async fn cancel_payment(&self, payment_intent_ref: &str) -> Result<(), GatewayError> {
        if payment_intent_ref.starts_with(FAILING_INTENT_PREFIX) {
            return Err(GatewayError::Processor(format!(
                "payment intent {payment_intent_ref} could not be cancelled"
            )));
        }
        self.ledger
            .write()
            .await
            .cancelled
            .push(payment_intent_ref.to_string());
        Ok(())
    }
}
