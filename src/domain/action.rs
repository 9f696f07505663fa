use super::booking::{ActorId, BookingId};
use super::charge::ChargeAdjustment;
use super::money::Percentage;
use crate::error::SettlementError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreTrip,
    PostTrip,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreTrip => f.write_str("pre-trip"),
            Phase::PostTrip => f.write_str("post-trip"),
        }
    }
}

/// Inbound action request for one booking, as received from the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub booking_id: BookingId,
    pub actor: ActorId,
    pub action: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_post_trip: Option<bool>,
    #[serde(default)]
    pub waive_percentage: Option<Decimal>,
    #[serde(default)]
    pub waive_reason: Option<String>,
    #[serde(default)]
    pub charge_adjustments: Option<Vec<ChargeAdjustment>>,
}

impl ActionRequest {
    pub fn new(booking_id: BookingId, actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            booking_id,
            actor: actor.into(),
            action: action.into(),
            notes: None,
            is_post_trip: None,
            waive_percentage: None,
            waive_reason: None,
            charge_adjustments: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn post_trip(mut self) -> Self {
        self.is_post_trip = Some(true);
        self
    }

    pub fn with_waiver(mut self, percentage: Decimal, reason: impl Into<String>) -> Self {
        self.waive_percentage = Some(percentage);
        self.waive_reason = Some(reason.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.waive_reason = Some(reason.into());
        self
    }

    pub fn with_adjustments(mut self, adjustments: Vec<ChargeAdjustment>) -> Self {
        self.charge_adjustments = Some(adjustments);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreTripAction {
    Approve { notes: Option<String> },
    Reject { notes: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostTripAction {
    ProcessCharges { notes: Option<String> },
    Waive { reason: String },
    PartialWaive { percentage: Percentage, reason: String },
    Adjust { adjustments: Vec<ChargeAdjustment>, notes: Option<String> },
    ReviewDispute { notes: Option<String> },
}

impl PostTripAction {
    pub fn name(&self) -> &'static str {
        match self {
            PostTripAction::ProcessCharges { .. } => "process_charges",
            PostTripAction::Waive { .. } => "waive",
            PostTripAction::PartialWaive { .. } => "partial_waive",
            PostTripAction::Adjust { .. } => "adjust",
            PostTripAction::ReviewDispute { .. } => "review_dispute",
        }
    }
}

impl PreTripAction {
    pub fn name(&self) -> &'static str {
        match self {
            PreTripAction::Approve { .. } => "approve",
            PreTripAction::Reject { .. } => "reject",
        }
    }
}

/// An action already scoped to the phase it is legal in.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    PreTrip(PreTripAction),
    PostTrip(PostTripAction),
}

const PRE_TRIP_ACTIONS: [&str; 2] = ["approve", "reject"];
const POST_TRIP_ACTIONS: [&str; 5] = [
    "process_charges",
    "waive",
    "partial_waive",
    "adjust",
    "review_dispute",
];

impl Action {
    /// Resolves the raw action name against the phase the booking is in.
    ///
    /// Names that exist in the other phase fail with `InvalidAction`; names
    /// that exist nowhere fail with `UnknownAction`. Required fields are
    /// checked here so that nothing downstream sees a half-formed request.
    pub fn parse(phase: Phase, request: &ActionRequest) -> Result<Self, SettlementError> {
        let name = request.action.trim();
        let notes = request.notes.clone();
        match (phase, name) {
            (Phase::PreTrip, "approve") => Ok(Action::PreTrip(PreTripAction::Approve { notes })),
            (Phase::PreTrip, "reject") => Ok(Action::PreTrip(PreTripAction::Reject { notes })),
            (Phase::PostTrip, "process_charges") => {
                Ok(Action::PostTrip(PostTripAction::ProcessCharges { notes }))
            }
            (Phase::PostTrip, "waive") => {
                let reason = request
                    .waive_reason
                    .clone()
                    .or(notes)
                    .filter(|r| !r.trim().is_empty())
                    .ok_or(SettlementError::MissingField("waiveReason"))?;
                Ok(Action::PostTrip(PostTripAction::Waive { reason }))
            }
            (Phase::PostTrip, "partial_waive") => {
                let raw = request
                    .waive_percentage
                    .ok_or(SettlementError::MissingField("waivePercentage"))?;
                let reason = request
                    .waive_reason
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .ok_or(SettlementError::MissingField("waiveReason"))?;
                let percentage = Percentage::new(raw)?;
                Ok(Action::PostTrip(PostTripAction::PartialWaive { percentage, reason }))
            }
            (Phase::PostTrip, "adjust") => {
                let adjustments = request
                    .charge_adjustments
                    .clone()
                    .ok_or(SettlementError::MissingField("chargeAdjustments"))?;
                if adjustments.is_empty() {
                    return Err(SettlementError::NoAdjustmentsProvided);
                }
                Ok(Action::PostTrip(PostTripAction::Adjust { adjustments, notes }))
            }
            (Phase::PostTrip, "review_dispute") => {
                Ok(Action::PostTrip(PostTripAction::ReviewDispute { notes }))
            }
            (phase, other) if PRE_TRIP_ACTIONS.contains(&other) || POST_TRIP_ACTIONS.contains(&other) => {
                Err(SettlementError::InvalidAction {
                    phase,
                    action: other.to_string(),
                })
            }
            (_, other) => Err(SettlementError::UnknownAction(other.to_string())),
        }
    }
}
