use super::booking::{ActorId, BookingId};
use super::charge::ChargeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DisputeId = Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    #[default]
    Open,
    UnderReview,
    Resolved,
}

/// A guest's contest of an assessed trip charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub id: DisputeId,
    pub booking_id: BookingId,
    #[serde(default)]
    pub charge_id: Option<ChargeId>,
    #[serde(default)]
    pub status: DisputeStatus,
    #[serde(default)]
    pub reason: Option<String>,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_by: Option<ActorId>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Dispute {
    pub fn is_open(&self) -> bool {
        self.status == DisputeStatus::Open
    }

    /// Moves an open dispute under review. Returns `false` if it was not open.
    pub fn begin_review(&mut self, actor: &str, at: DateTime<Utc>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = DisputeStatus::UnderReview;
        self.reviewed_by = Some(actor.to_string());
        self.reviewed_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_only_from_open() {
        let mut dispute = Dispute {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            charge_id: None,
            status: DisputeStatus::Open,
            reason: Some("fuel was full".into()),
            opened_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
        };

        assert!(dispute.begin_review("admin-1", Utc::now()));
        assert_eq!(dispute.status, DisputeStatus::UnderReview);
        assert_eq!(dispute.reviewed_by.as_deref(), Some("admin-1"));

        assert!(!dispute.begin_review("admin-2", Utc::now()));
        assert_eq!(dispute.reviewed_by.as_deref(), Some("admin-1"));
    }
}
