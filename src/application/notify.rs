use crate::domain::booking::Booking;
use crate::domain::money::Money;
use crate::domain::ports::{Notification, NotifierHandle};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Approved,
    Rejected,
    ChargesProcessed,
    ChargesWaived,
}

/// Sends guest notices after an outcome has been committed.
///
/// Failures are logged and swallowed: by the time a notice goes out the
/// financial state is already persisted and must not change. A delivery
/// that outlives `timeout` is abandoned.
#[derive(Clone)]
pub struct NoticeSender {
    notifier: NotifierHandle,
    timeout: Duration,
}

impl NoticeSender {
    pub fn new(notifier: NotifierHandle, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    pub async fn send(
        &self,
        kind: NoticeKind,
        booking: &Booking,
        headline: &str,
        amount: Option<Money>,
        notes: Option<&str>,
    ) {
        let payload = Notification {
            booking_id: booking.id,
            headline: headline.to_string(),
            amount,
            notes: notes.map(str::to_string),
        };
        let notifier = self.notifier.clone();
        let email = booking.guest_email.clone();
        // Run on its own task so a panicking notifier is contained as well.
        let mut delivery = tokio::spawn(async move {
            match kind {
                NoticeKind::Approved => notifier.send_booking_approved(&email, payload).await,
                NoticeKind::Rejected => notifier.send_booking_rejected(&email, payload).await,
                NoticeKind::ChargesProcessed => notifier.send_charges_processed(&email, payload).await,
                NoticeKind::ChargesWaived => notifier.send_charges_waived(&email, payload).await,
            }
        });
        match tokio::time::timeout(self.timeout, &mut delivery).await {
            Ok(Ok(Ok(()))) => debug!(booking = %booking.id, ?kind, "notice sent"),
            Ok(Ok(Err(e))) => warn!(booking = %booking.id, ?kind, error = %e, "notice not delivered"),
            Ok(Err(e)) => warn!(booking = %booking.id, ?kind, error = %e, "notifier task aborted"),
            Err(_) => {
                delivery.abort();
                warn!(booking = %booking.id, ?kind, timeout = ?self.timeout, "notice delivery timed out");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{Notifier, NotifierError};
    use async_trait::async_trait;
    use std::sync::Arc;
    use uuid::Uuid;

    struct StalledNotifier;

    #[async_trait]
    impl Notifier for StalledNotifier {
        async fn send_booking_approved(&self, _: &str, _: Notification) -> Result<(), NotifierError> {
            std::future::pending().await
        }
        async fn send_booking_rejected(&self, _: &str, _: Notification) -> Result<(), NotifierError> {
            std::future::pending().await
        }
        async fn send_charges_processed(&self, _: &str, _: Notification) -> Result<(), NotifierError> {
            std::future::pending().await
        }
        async fn send_charges_waived(&self, _: &str, _: Notification) -> Result<(), NotifierError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_notifier_does_not_block() {
        let sender = NoticeSender::new(Arc::new(StalledNotifier), Duration::from_millis(20));
        let booking = Booking::new(Uuid::new_v4(), "guest@example.com");

        let sent = tokio::time::timeout(
            Duration::from_secs(2),
            sender.send(NoticeKind::Approved, &booking, "Booking approved", None, None),
        )
        .await;
        assert!(sent.is_ok());
    }
}
