use super::audit::AuditMessage;
use super::booking::{Booking, BookingId};
use super::charge::{ChargeId, TripCharge};
use super::dispute::Dispute;
use super::money::Money;
use super::payment::{
    AdjustedCharge, CaptureResult, ChargeResult, FeeCharge, GatewayCharge, GatewayError,
    IdempotencyKey, WaiverRequest, WaiverSplit,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn store_booking(&self, booking: Booking) -> Result<()>;
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;
    async fn all_bookings(&self) -> Result<Vec<Booking>>;
    async fn store_dispute(&self, dispute: Dispute) -> Result<()>;
    async fn disputes_for(&self, booking_id: BookingId) -> Result<Vec<Dispute>>;

    async fn open_disputes(&self, booking_id: BookingId) -> Result<Vec<Dispute>> {
        let disputes = self.disputes_for(booking_id).await?;
        Ok(disputes.into_iter().filter(Dispute::is_open).collect())
    }
}

#[async_trait]
pub trait ChargeStore: Send + Sync {
    async fn store_charge(&self, charge: TripCharge) -> Result<()>;
    async fn get_charge(&self, booking_id: BookingId, id: ChargeId) -> Result<Option<TripCharge>>;
    async fn charges_for(&self, booking_id: BookingId) -> Result<Vec<TripCharge>>;
    async fn get_intent(&self, key: &IdempotencyKey) -> Result<Option<SettlementIntent>>;
    async fn reserve_intent(&self, intent: SettlementIntent) -> Result<()>;

    /// The most recent trip charge that has not reached a terminal status.
    async fn latest_unresolved_charge(&self, booking_id: BookingId) -> Result<Option<TripCharge>> {
        let charges = self.charges_for(booking_id).await?;
        Ok(charges
            .into_iter()
            .filter(TripCharge::is_unresolved)
            .max_by_key(|c| c.created_at))
    }
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, message: AuditMessage) -> Result<()>;
    async fn messages_for(&self, booking_id: BookingId) -> Result<Vec<AuditMessage>>;
}

/// Everything written for a single resolution outcome.
#[derive(Debug, Clone)]
pub struct SettlementCommit {
    pub booking: Booking,
    pub charge: Option<TripCharge>,
    pub disputes: Vec<Dispute>,
    pub message: AuditMessage,
    pub intent: Option<SettlementIntent>,
}

impl SettlementCommit {
    pub fn new(booking: Booking, message: AuditMessage) -> Self {
        Self {
            booking,
            charge: None,
            disputes: Vec::new(),
            message,
            intent: None,
        }
    }

    pub fn with_charge(mut self, charge: TripCharge) -> Self {
        self.charge = Some(charge);
        self
    }

    pub fn with_disputes(mut self, disputes: Vec<Dispute>) -> Self {
        self.disputes = disputes;
        self
    }

    pub fn with_intent(mut self, intent: Option<SettlementIntent>) -> Self {
        self.intent = intent;
        self
    }
}

#[async_trait]
pub trait SettlementStore: BookingStore + ChargeStore + AuditLog {
    /// Applies every write in `commit` atomically.
    async fn commit(&self, commit: SettlementCommit) -> Result<()>;
}

pub type SettlementStoreHandle = Arc<dyn SettlementStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Reserved,
    Succeeded,
    Failed,
}

/// A gateway charge that has been reserved locally before the call is made.
///
/// An intent still `RESERVED` on the next attempt means the previous process
/// stopped between the gateway call and the local commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementIntent {
    pub key: IdempotencyKey,
    pub booking_id: BookingId,
    pub charge_id: ChargeId,
    pub action: String,
    pub amount: Money,
    pub status: IntentStatus,
    pub reserved_at: DateTime<Utc>,
    #[serde(default)]
    pub gateway_charge_id: Option<String>,
}

impl SettlementIntent {
    pub fn reserve(
        key: IdempotencyKey,
        booking_id: BookingId,
        charge_id: ChargeId,
        action: &str,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            booking_id,
            charge_id,
            action: action.to_string(),
            amount,
            status: IntentStatus::Reserved,
            reserved_at: at,
            gateway_charge_id: None,
        }
    }

    pub fn finalize(mut self, result: &ChargeResult) -> Self {
        self.status = if result.is_success() {
            IntentStatus::Succeeded
        } else {
            IntentStatus::Failed
        };
        self.gateway_charge_id = result.charge_id.clone();
        self
    }
}

/// Capability contract of the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge_additional_fees(&self, charge: FeeCharge) -> std::result::Result<GatewayCharge, GatewayError>;
    async fn waive_charges(&self, request: WaiverRequest) -> std::result::Result<WaiverSplit, GatewayError>;
    async fn adjust_and_charge(&self, charge: AdjustedCharge) -> std::result::Result<GatewayCharge, GatewayError>;
    async fn confirm_and_capture_payment(
        &self,
        payment_intent_ref: &str,
        method_ref: Option<&str>,
    ) -> std::result::Result<CaptureResult, GatewayError>;
    async fn cancel_payment(&self, payment_intent_ref: &str) -> std::result::Result<(), GatewayError>;
}

pub type PaymentGatewayHandle = Arc<dyn PaymentGateway>;

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifierError(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub booking_id: BookingId,
    pub headline: String,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outbound guest notifications. Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_booking_approved(&self, email: &str, payload: Notification) -> std::result::Result<(), NotifierError>;
    async fn send_booking_rejected(&self, email: &str, payload: Notification) -> std::result::Result<(), NotifierError>;
    async fn send_charges_processed(&self, email: &str, payload: Notification) -> std::result::Result<(), NotifierError>;
    async fn send_charges_waived(&self, email: &str, payload: Notification) -> std::result::Result<(), NotifierError>;
}

pub type NotifierHandle = Arc<dyn Notifier>;
