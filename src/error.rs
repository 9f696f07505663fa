use crate::domain::action::Phase;
use crate::domain::booking::{BookingId, VerificationStatus};
use crate::domain::charge::ChargeId;
use crate::domain::payment::IdempotencyKey;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("action `{action}` is not valid for the {phase} phase")]
    InvalidAction { phase: Phase, action: String },
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("waive percentage must be greater than 0 and at most 100, got {0}")]
    InvalidWaivePercentage(Decimal),
    #[error("no charge adjustments provided")]
    NoAdjustmentsProvided,
    #[error("invalid charge adjustment: {0}")]
    InvalidAdjustment(String),
    #[error("amount must not be negative, got {0}")]
    InvalidAmount(Decimal),

    #[error("booking {0} not found")]
    NotFound(BookingId),

    #[error("no charges to process for booking {0}")]
    NoChargesToProcess(BookingId),
    #[error("no payment method on file for booking {0}")]
    NoPaymentMethod(BookingId),
    #[error("booking {booking} has already been reviewed ({status:?})")]
    VerificationAlreadyResolved {
        booking: BookingId,
        status: VerificationStatus,
    },
    #[error("a waiver has already been recorded on trip charge {0}")]
    WaiverAlreadyRecorded(ChargeId),
    #[error("trip charge {0} has already been adjusted")]
    AdjustmentAlreadyRecorded(ChargeId),
    #[error("no open disputes on booking {0}")]
    NoOpenDisputes(BookingId),
    #[error("charge attempt {0} was sent for a different amount and never recorded")]
    UnreconciledIntent(IdempotencyKey),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or illegal request; nothing was changed.
    Validation,
    NotFound,
    /// The booking's current state does not allow the action; nothing was changed.
    Precondition,
    Internal,
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettlementError::InvalidAction { .. }
            | SettlementError::UnknownAction(_)
            | SettlementError::MissingField(_)
            | SettlementError::InvalidWaivePercentage(_)
            | SettlementError::NoAdjustmentsProvided
            | SettlementError::InvalidAdjustment(_)
            | SettlementError::InvalidAmount(_) => ErrorKind::Validation,
            SettlementError::NotFound(_) => ErrorKind::NotFound,
            SettlementError::NoChargesToProcess(_)
            | SettlementError::NoPaymentMethod(_)
            | SettlementError::VerificationAlreadyResolved { .. }
            | SettlementError::WaiverAlreadyRecorded(_)
            | SettlementError::AdjustmentAlreadyRecorded(_)
            | SettlementError::NoOpenDisputes(_)
            | SettlementError::UnreconciledIntent(_) => ErrorKind::Precondition,
            _ => ErrorKind::Internal,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SettlementError::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(SettlementError::NotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(SettlementError::NoPaymentMethod(id).kind(), ErrorKind::Precondition);
        assert_eq!(SettlementError::NoAdjustmentsProvided.kind(), ErrorKind::Validation);
        assert_eq!(SettlementError::internal("boom").kind(), ErrorKind::Internal);
    }
}
