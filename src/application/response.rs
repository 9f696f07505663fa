use crate::domain::booking::Booking;
use crate::domain::charge::AdjustmentRecord;
use crate::domain::money::Money;
use crate::domain::payment::ChargeResult;
use serde::{Deserialize, Serialize};

/// What the caller gets back from any accepted action.
///
/// `success` reflects the financial outcome; a declined card is still an
/// accepted request, reported through `charge_result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_result: Option<ChargeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waived_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment_record: Option<AdjustmentRecord>,
    pub booking: Booking,
}

impl ActionResponse {
    pub fn new(success: bool, message: impl Into<String>, booking: Booking) -> Self {
        Self {
            success,
            message: message.into(),
            charge_result: None,
            waived_amount: None,
            remaining_amount: None,
            adjustment_record: None,
            booking,
        }
    }

    pub fn with_charge_result(mut self, result: ChargeResult) -> Self {
        self.charge_result = Some(result);
        self
    }

    pub fn with_waiver(mut self, waived: Money, remaining: Money) -> Self {
        self.waived_amount = Some(waived);
        self.remaining_amount = Some(remaining);
        self
    }

    pub fn with_adjustment(mut self, record: AdjustmentRecord) -> Self {
        self.adjustment_record = Some(record);
        self
    }
}
