//! Append-only audit trail.
//!
//! Each resolution attempt writes exactly one [`AuditMessage`], including
//! attempts whose gateway call failed. Payloads are typed per outcome and carry
//! a schema version so the trail stays machine-readable as it evolves.

use super::booking::{ActorId, BookingId};
use super::charge::{AdjustmentRecord, ChargeId};
use super::dispute::DisputeId;
use super::money::{Money, Percentage};
use super::payment::{CaptureResult, ChargeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const AUDIT_SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMessage {
    pub id: Uuid,
    pub booking_id: BookingId,
    #[serde(default)]
    pub charge_id: Option<ChargeId>,
    pub actor: ActorId,
    pub created_at: DateTime<Utc>,
    pub summary: String,
    pub payload: AuditPayload,
}

impl AuditMessage {
    pub fn new(
        booking_id: BookingId,
        charge_id: Option<ChargeId>,
        actor: &str,
        created_at: DateTime<Utc>,
        event: AuditEvent,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            charge_id,
            actor: actor.to_string(),
            created_at,
            summary: event.summary(),
            payload: AuditPayload {
                version: AUDIT_SCHEMA_VERSION,
                event,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPayload {
    pub version: u16,
    #[serde(flatten)]
    pub event: AuditEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    BookingApproved {
        notes: Option<String>,
        capture: Option<CaptureResult>,
        capture_error: Option<String>,
    },
    BookingRejected {
        notes: Option<String>,
        hold_released: bool,
        release_error: Option<String>,
    },
    ChargesProcessed {
        amount: Money,
        result: ChargeResult,
    },
    ChargesWaived {
        amount: Money,
        reason: String,
    },
    ChargesPartiallyWaived {
        percentage: Percentage,
        reason: String,
        waived_amount: Money,
        remaining_amount: Money,
        remainder_result: Option<ChargeResult>,
    },
    ChargesAdjusted {
        record: AdjustmentRecord,
        result: ChargeResult,
    },
    DisputeReviewStarted {
        notes: Option<String>,
        disputes: Vec<DisputeId>,
    },
}

impl AuditEvent {
    pub fn summary(&self) -> String {
        match self {
            AuditEvent::BookingApproved { capture_error, .. } => match capture_error {
                None => "Booking approved; payment captured".to_string(),
                Some(error) => format!("Booking approved; payment capture failed: {error}"),
            },
            AuditEvent::BookingRejected { hold_released, .. } => {
                if *hold_released {
                    "Booking rejected; payment hold released".to_string()
                } else {
                    "Booking rejected; payment hold not released".to_string()
                }
            }
            AuditEvent::ChargesProcessed { amount, result } => {
                if result.is_success() {
                    format!("Trip charges of {amount} collected")
                } else {
                    format!("Trip charge of {amount} failed: {}", result.error_message())
                }
            }
            AuditEvent::ChargesWaived { amount, reason } => {
                format!("Trip charges of {amount} waived: {reason}")
            }
            AuditEvent::ChargesPartiallyWaived {
                percentage,
                waived_amount,
                remaining_amount,
                remainder_result,
                ..
            } => match remainder_result {
                Some(result) if result.is_success() => format!(
                    "{percentage} of trip charges waived ({waived_amount}); remaining {remaining_amount} collected"
                ),
                Some(result) => format!(
                    "{percentage} of trip charges waived ({waived_amount}); remaining {remaining_amount} failed: {}",
                    result.error_message()
                ),
                None if remaining_amount.is_zero() => {
                    format!("{percentage} of trip charges waived ({waived_amount})")
                }
                None => format!(
                    "{percentage} of trip charges waived ({waived_amount}); remaining {remaining_amount} pending, no payment method on file"
                ),
            },
            AuditEvent::ChargesAdjusted { record, result } => {
                if result.is_success() {
                    format!(
                        "Trip charges adjusted from {} to {} and collected",
                        record.original_total, record.adjusted_total
                    )
                } else {
                    format!(
                        "Adjusted trip charge of {} failed: {}",
                        record.adjusted_total,
                        result.error_message()
                    )
                }
            }
            AuditEvent::DisputeReviewStarted { disputes, .. } => {
                format!("{} dispute(s) moved under review", disputes.len())
            }
        }
    }
}
