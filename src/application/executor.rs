use super::payments::{ChargeOrder, PaymentAdapter};
use crate::domain::charge::{AdjustmentRecord, TripCharge};
use crate::domain::money::Money;
use crate::domain::payment::{ChargeResult, IdempotencyKey, PaymentMethod};
use crate::domain::ports::{ChargeStore, IntentStatus, SettlementIntent, SettlementStoreHandle};
use crate::error::{Result, SettlementError};
use chrono::Utc;
use tracing::{info, warn};

/// Actions that move money through the gateway, and therefore reserve intents.
pub const CHARGING_ACTIONS: [&str; 3] = ["process_charges", "partial_waive", "adjust"];

/// A completed gateway attempt and the intent that must be finalized with it.
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: ChargeResult,
    pub intent: SettlementIntent,
}

impl Execution {
    pub fn finalized_intent(&self) -> SettlementIntent {
        self.intent.clone().finalize(&self.result)
    }
}

/// Reserve-intent then call-gateway step shared by every charging strategy.
///
/// The caller finishes the protocol by committing the outcome together with
/// [`Execution::finalized_intent`].
#[derive(Clone)]
pub struct ChargeExecutor {
    store: SettlementStoreHandle,
    payments: PaymentAdapter,
}

impl ChargeExecutor {
    pub fn new(store: SettlementStoreHandle, payments: PaymentAdapter) -> Self {
        Self { store, payments }
    }

    pub async fn charge(
        &self,
        method: &PaymentMethod,
        charge: &TripCharge,
        action: &'static str,
        amount: Money,
        description: String,
    ) -> Result<Execution> {
        let intent = self.reserve(charge, action, amount).await?;
        Ok(self.execute(method, charge, action, intent, description).await)
    }

    /// Calls the gateway under an intent already returned by [`Self::reserve`].
    pub async fn execute(
        &self,
        method: &PaymentMethod,
        charge: &TripCharge,
        action: &'static str,
        intent: SettlementIntent,
        description: String,
    ) -> Execution {
        let result = self
            .payments
            .charge(ChargeOrder {
                method,
                amount: intent.amount,
                description,
                booking_id: charge.booking_id,
                charge_id: charge.id,
                action,
                idempotency_key: intent.key.clone(),
            })
            .await;
        Execution { result, intent }
    }

    pub async fn charge_adjusted(
        &self,
        method: &PaymentMethod,
        charge: &TripCharge,
        record: &AdjustmentRecord,
    ) -> Result<Execution> {
        let intent = self.reserve(charge, "adjust", record.adjusted_total).await?;
        let result = self
            .payments
            .adjust_and_charge(method, record, charge.booking_id, intent.key.clone())
            .await;
        Ok(Execution { result, intent })
    }

    /// Reserves the intent for the next attempt on `charge`, or resumes a
    /// dangling one for the same amount.
    pub async fn reserve(&self, charge: &TripCharge, action: &str, amount: Money) -> Result<SettlementIntent> {
        let attempt = charge.failed_attempts;
        for candidate in CHARGING_ACTIONS {
            let key = IdempotencyKey::derive(charge.booking_id, candidate, charge.id, attempt);
            if let Some(dangling) = self.store.get_intent(&key).await?
                && dangling.status == IntentStatus::Reserved
            {
                if dangling.amount == amount {
                    warn!(
                        booking = %charge.booking_id,
                        key = %dangling.key,
                        "resuming charge whose outcome was never recorded"
                    );
                    return Ok(dangling);
                }
                return Err(SettlementError::UnreconciledIntent(dangling.key));
            }
        }

        let key = IdempotencyKey::derive(charge.booking_id, action, charge.id, attempt);
        let intent = SettlementIntent::reserve(key, charge.booking_id, charge.id, action, amount, Utc::now());
        self.store.reserve_intent(intent.clone()).await?;
        info!(booking = %charge.booking_id, key = %intent.key, amount = %amount, "charge intent reserved");
        Ok(intent)
    }
}
