use crate::domain::ports::{Notification, Notifier, NotifierError};
use async_trait::async_trait;
use tracing::info;

/// Notifier that records each notice as a `tracing` event.
///
/// Template rendering and delivery live outside this crate; this adapter is
/// what the CLI wires in.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    fn emit(&self, kind: &str, email: &str, payload: &Notification) -> Result<(), NotifierError> {
        info!(
            target: "trip_settlement::notices",
            kind,
            email,
            booking = %payload.booking_id,
            amount = ?payload.amount.map(|a| a.to_string()),
            "{}",
            payload.headline
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_booking_approved(&self, email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.emit("booking_approved", email, &payload)
    }

    async fn send_booking_rejected(&self, email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.emit("booking_rejected", email, &payload)
    }

    async fn send_charges_processed(&self, email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.emit("charges_processed", email, &payload)
    }

    async fn send_charges_waived(&self, email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.emit("charges_waived", email, &payload)
    }
}
