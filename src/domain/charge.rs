use super::booking::{ActorId, BookingId};
use super::money::{Money, Percentage};
use crate::error::SettlementError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

pub type ChargeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    Pending,
    Charged,
    Failed,
    FullyWaived,
    PartiallyWaived,
    PartialCharged,
    AdjustedCharged,
    Disputed,
}

impl ChargeStatus {
    /// Terminal statuses carry a completed financial effect and are never
    /// processed again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChargeStatus::Charged
                | ChargeStatus::FullyWaived
                | ChargeStatus::AdjustedCharged
                | ChargeStatus::PartialCharged
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeCategory {
    Mileage,
    Fuel,
    Late,
    Damage,
    Cleaning,
}

impl ChargeCategory {
    pub const ALL: [ChargeCategory; 5] = [
        ChargeCategory::Mileage,
        ChargeCategory::Fuel,
        ChargeCategory::Late,
        ChargeCategory::Damage,
        ChargeCategory::Cleaning,
    ];
}

impl fmt::Display for ChargeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChargeCategory::Mileage => "mileage",
            ChargeCategory::Fuel => "fuel",
            ChargeCategory::Late => "late",
            ChargeCategory::Damage => "damage",
            ChargeCategory::Cleaning => "cleaning",
        };
        f.write_str(name)
    }
}

/// Per-category amounts accrued during a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineItems {
    #[serde(default)]
    pub mileage: Money,
    #[serde(default)]
    pub fuel: Money,
    #[serde(default)]
    pub late: Money,
    #[serde(default)]
    pub damage: Money,
    #[serde(default)]
    pub cleaning: Money,
}

impl LineItems {
    pub fn amount(&self, category: ChargeCategory) -> Money {
        match category {
            ChargeCategory::Mileage => self.mileage,
            ChargeCategory::Fuel => self.fuel,
            ChargeCategory::Late => self.late,
            ChargeCategory::Damage => self.damage,
            ChargeCategory::Cleaning => self.cleaning,
        }
    }

    pub fn total(&self) -> Money {
        ChargeCategory::ALL.iter().map(|c| self.amount(*c)).sum()
    }
}

/// Provenance of a (full or partial) waiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiverRecord {
    pub actor: ActorId,
    pub reason: String,
    pub percentage: Percentage,
    pub waived_amount: Money,
    pub remaining_amount: Money,
    pub recorded_at: DateTime<Utc>,
}

/// One requested line-item adjustment, as submitted by the admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeAdjustment {
    #[serde(rename = "type")]
    pub category: ChargeCategory,
    pub original_amount: Money,
    pub adjusted_amount: Money,
    pub included: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ChargeAdjustment {
    /// Amount this item contributes to the adjusted total.
    pub fn effective_amount(&self) -> Money {
        if self.included {
            self.adjusted_amount
        } else {
            Money::ZERO
        }
    }
}

/// Original-versus-adjusted record persisted on the trip charge for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRecord {
    pub items: Vec<ChargeAdjustment>,
    pub original_total: Money,
    pub adjusted_total: Money,
    pub adjusted_by: ActorId,
    pub adjusted_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AdjustmentRecord {
    /// Validates the adjustments against the charge's recorded line items and
    /// computes the adjusted total.
    ///
    /// The list is the complete new itemisation: categories that are not
    /// listed, or listed as excluded, contribute nothing. An item may only
    /// keep or reduce what the trip accrued for its category.
    pub fn build(
        items: Vec<ChargeAdjustment>,
        charge: &TripCharge,
        actor: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Self, SettlementError> {
        if items.is_empty() {
            return Err(SettlementError::NoAdjustmentsProvided);
        }

        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.category) {
                return Err(SettlementError::InvalidAdjustment(format!(
                    "{} listed more than once",
                    item.category
                )));
            }
            let recorded = charge.line_items.amount(item.category);
            if item.original_amount != recorded {
                return Err(SettlementError::InvalidAdjustment(format!(
                    "{} original amount {} does not match the recorded {}",
                    item.category, item.original_amount, recorded
                )));
            }
            if item.adjusted_amount > item.original_amount {
                return Err(SettlementError::InvalidAdjustment(format!(
                    "{} adjusted amount {} exceeds original {}",
                    item.category, item.adjusted_amount, item.original_amount
                )));
            }
        }

        let adjusted_total: Money = items.iter().map(ChargeAdjustment::effective_amount).sum();
        if adjusted_total.is_zero() {
            return Err(SettlementError::InvalidAdjustment(
                "adjusted total is zero; waive the charges instead".to_string(),
            ));
        }

        Ok(Self {
            items,
            original_total: charge.total,
            adjusted_total,
            adjusted_by: actor.to_string(),
            adjusted_at: at,
            notes: notes.map(str::to_string),
        })
    }
}

/// Settlement record for the costs accrued after one trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripCharge {
    pub id: ChargeId,
    pub booking_id: BookingId,
    #[serde(flatten)]
    pub line_items: LineItems,
    pub total: Money,
    #[serde(rename = "chargeStatus")]
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
    /// Gateway attempts that were finalized as failed.
    #[serde(default)]
    pub failed_attempts: u32,
    #[serde(default)]
    pub waiver: Option<WaiverRecord>,
    #[serde(default)]
    pub adjustment: Option<AdjustmentRecord>,
    #[serde(default)]
    pub gateway_charge_id: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl TripCharge {
    pub fn new(booking_id: BookingId, line_items: LineItems, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            line_items,
            total: line_items.total(),
            status: ChargeStatus::Pending,
            created_at,
            failed_attempts: 0,
            waiver: None,
            adjustment: None,
            gateway_charge_id: None,
            failure_reason: None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn waived_amount(&self) -> Money {
        self.waiver
            .as_ref()
            .map(|w| w.waived_amount)
            .unwrap_or(Money::ZERO)
    }

    /// What is still owed: the adjusted total if the charge was re-itemised,
    /// otherwise the total less any recorded waiver.
    pub fn outstanding(&self) -> Money {
        match &self.adjustment {
            Some(record) => record.adjusted_total,
            None => self.total - self.waived_amount(),
        }
    }

    pub fn record_charge_success(&mut self, status: ChargeStatus, gateway_charge_id: Option<String>) {
        self.status = status;
        self.gateway_charge_id = gateway_charge_id;
        self.failure_reason = None;
    }

    /// A failed attempt keeps the charge retryable. A charge that carries a
    /// waiver stays `PARTIALLY_WAIVED` so the waiver is never lost.
    pub fn record_charge_failure(&mut self, error: impl Into<String>) {
        self.status = if self.waiver.is_some() {
            ChargeStatus::PartiallyWaived
        } else {
            ChargeStatus::Failed
        };
        self.failed_attempts += 1;
        self.failure_reason = Some(error.into());
    }

    pub fn record_full_waiver(&mut self, actor: &str, reason: &str, at: DateTime<Utc>) {
        self.waiver = Some(WaiverRecord {
            actor: actor.to_string(),
            reason: reason.to_string(),
            percentage: Percentage::FULL,
            waived_amount: self.total,
            remaining_amount: Money::ZERO,
            recorded_at: at,
        });
        self.status = ChargeStatus::FullyWaived;
        self.failure_reason = None;
    }

    pub fn record_partial_waiver(&mut self, record: WaiverRecord) {
        self.waiver = Some(record);
        self.status = ChargeStatus::PartiallyWaived;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn money(value: rust_decimal::Decimal) -> Money {
        Money::new(value).unwrap()
    }

    fn adjustment(category: ChargeCategory, original: Money, adjusted: Money, included: bool) -> ChargeAdjustment {
        ChargeAdjustment {
            category,
            original_amount: original,
            adjusted_amount: adjusted,
            included,
            reason: None,
        }
    }

    #[test]
    fn test_total_from_line_items() {
        let items = LineItems {
            mileage: money(dec!(50)),
            fuel: money(dec!(20)),
            ..Default::default()
        };
        let charge = TripCharge::new(Uuid::new_v4(), items, Utc::now());
        assert_eq!(charge.total, money(dec!(70)));
        assert_eq!(charge.status, ChargeStatus::Pending);
        assert!(charge.is_unresolved());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ChargeStatus::Charged.is_terminal());
        assert!(ChargeStatus::FullyWaived.is_terminal());
        assert!(ChargeStatus::AdjustedCharged.is_terminal());
        assert!(ChargeStatus::PartialCharged.is_terminal());
        assert!(!ChargeStatus::Failed.is_terminal());
        assert!(!ChargeStatus::PartiallyWaived.is_terminal());
        assert!(!ChargeStatus::Disputed.is_terminal());
    }

    fn trip(items: LineItems) -> TripCharge {
        TripCharge::new(Uuid::new_v4(), items, Utc::now())
    }

    #[test]
    fn test_adjustment_excludes_and_reduces() {
        let charge = trip(LineItems {
            mileage: money(dec!(50)),
            damage: money(dec!(200)),
            ..Default::default()
        });
        let items = vec![
            adjustment(ChargeCategory::Damage, money(dec!(200)), money(dec!(200)), false),
            adjustment(ChargeCategory::Mileage, money(dec!(50)), money(dec!(30)), true),
        ];
        let record = AdjustmentRecord::build(items, &charge, "admin", None, Utc::now()).unwrap();
        assert_eq!(record.adjusted_total, money(dec!(30)));
        assert_eq!(record.original_total, money(dec!(250)));
    }

    #[test]
    fn test_adjustment_validation() {
        let charge = trip(LineItems {
            fuel: money(dec!(20)),
            late: money(dec!(15)),
            ..Default::default()
        });

        assert!(matches!(
            AdjustmentRecord::build(vec![], &charge, "admin", None, Utc::now()),
            Err(SettlementError::NoAdjustmentsProvided)
        ));

        let too_high = vec![adjustment(ChargeCategory::Fuel, money(dec!(20)), money(dec!(25)), true)];
        assert!(matches!(
            AdjustmentRecord::build(too_high, &charge, "admin", None, Utc::now()),
            Err(SettlementError::InvalidAdjustment(_))
        ));

        let duplicate = vec![
            adjustment(ChargeCategory::Fuel, money(dec!(20)), money(dec!(10)), true),
            adjustment(ChargeCategory::Fuel, money(dec!(20)), money(dec!(5)), true),
        ];
        assert!(matches!(
            AdjustmentRecord::build(duplicate, &charge, "admin", None, Utc::now()),
            Err(SettlementError::InvalidAdjustment(_))
        ));

        let nothing_left = vec![adjustment(ChargeCategory::Late, money(dec!(15)), money(dec!(15)), false)];
        assert!(matches!(
            AdjustmentRecord::build(nothing_left, &charge, "admin", None, Utc::now()),
            Err(SettlementError::InvalidAdjustment(_))
        ));
    }

    #[test]
    fn test_adjustment_must_match_recorded_line_items() {
        let charge = trip(LineItems {
            mileage: money(dec!(50)),
            fuel: money(dec!(20)),
            ..Default::default()
        });

        let inflated = vec![adjustment(ChargeCategory::Mileage, money(dec!(5000)), money(dec!(4000)), true)];
        assert!(matches!(
            AdjustmentRecord::build(inflated, &charge, "admin", None, Utc::now()),
            Err(SettlementError::InvalidAdjustment(_))
        ));

        let unaccrued = vec![adjustment(ChargeCategory::Damage, money(dec!(300)), money(dec!(100)), true)];
        assert!(matches!(
            AdjustmentRecord::build(unaccrued, &charge, "admin", None, Utc::now()),
            Err(SettlementError::InvalidAdjustment(_))
        ));

        let matching = vec![adjustment(ChargeCategory::Mileage, money(dec!(50)), money(dec!(45)), true)];
        let record = AdjustmentRecord::build(matching, &charge, "admin", None, Utc::now()).unwrap();
        assert_eq!(record.adjusted_total, money(dec!(45)));
    }

    #[test]
    fn test_failure_after_waiver_keeps_waiver() {
        let items = LineItems {
            mileage: money(dec!(70)),
            ..Default::default()
        };
        let mut charge = TripCharge::new(Uuid::new_v4(), items, Utc::now());
        charge.record_partial_waiver(WaiverRecord {
            actor: "admin".into(),
            reason: "goodwill".into(),
            percentage: Percentage::new(dec!(50)).unwrap(),
            waived_amount: money(dec!(35)),
            remaining_amount: money(dec!(35)),
            recorded_at: Utc::now(),
        });
        charge.record_charge_failure("declined");

        assert_eq!(charge.status, ChargeStatus::PartiallyWaived);
        assert_eq!(charge.failed_attempts, 1);
        assert_eq!(charge.outstanding(), money(dec!(35)));
    }

    #[test]
    fn test_charge_adjustment_json_shape() {
        let json = r#"{"type":"mileage","originalAmount":"50","adjustedAmount":"30","included":true}"#;
        let item: ChargeAdjustment = serde_json::from_str(json).unwrap();
        assert_eq!(item.category, ChargeCategory::Mileage);
        assert_eq!(item.effective_amount(), money(dec!(30)));
    }
}
