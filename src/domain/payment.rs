//! Contract types for the external payment gateway.
//!
//! Gateway failures are values here, not errors: the resolvers receive a
//! [`ChargeResult`] whichever way the call went.

use super::booking::{ActorId, BookingId};
use super::charge::{AdjustmentRecord, ChargeId};
use super::money::{Money, Percentage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A stored payment method on the booking's customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub customer_ref: String,
    pub method_ref: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("gateway timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("payment processor error: {0}")]
    Processor(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Succeeded,
    Failed,
}

/// Outcome of a charge attempt as seen by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResult {
    pub status: GatewayStatus,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChargeResult {
    pub fn succeeded(amount: Money, charge_id: impl Into<String>) -> Self {
        Self {
            status: GatewayStatus::Succeeded,
            amount,
            charge_id: Some(charge_id.into()),
            error: None,
        }
    }

    pub fn failed(amount: Money, error: impl fmt::Display) -> Self {
        Self {
            status: GatewayStatus::Failed,
            amount,
            charge_id: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GatewayStatus::Succeeded
    }

    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "payment failed".to_string())
    }
}

/// Deduplication key passed to the gateway for every charge.
///
/// Derived from the booking, the action, the trip charge and the number of
/// failed attempts already finalized, so a resubmission of an attempt whose
/// outcome was never recorded locally reuses the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn derive(booking_id: BookingId, action: &str, charge_id: ChargeId, attempt: u32) -> Self {
        Self(format!("{booking_id}:{action}:{charge_id}:{attempt}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeMetadata {
    pub booking_id: BookingId,
    pub charge_id: ChargeId,
    pub action: String,
}

/// `chargeAdditionalFees` request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeCharge {
    pub customer_ref: String,
    pub method_ref: String,
    pub amount_minor_units: i64,
    pub description: String,
    pub metadata: ChargeMetadata,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCharge {
    pub charge_id: String,
    pub amount_minor_units: i64,
}

/// `waiveCharges` request. The gateway only records the waiver.
#[derive(Debug, Clone, PartialEq)]
pub struct WaiverRequest {
    pub booking_id: BookingId,
    pub total: Money,
    pub percentage: Percentage,
    pub reason: String,
    pub actor: ActorId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiverSplit {
    pub waived_amount: Money,
    pub remaining_amount: Money,
}

/// `adjustAndCharge` request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedCharge {
    pub customer_ref: String,
    pub method_ref: String,
    pub record: AdjustmentRecord,
    pub booking_id: BookingId,
    pub actor: ActorId,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub status: GatewayStatus,
    pub id: String,
    pub amount: Money,
}
