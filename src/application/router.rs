use super::notify::NoticeSender;
use super::payments::PaymentAdapter;
use super::post_trip::PostTripChargeResolver;
use super::pre_trip::PreTripResolver;
use super::response::ActionResponse;
use crate::config::SettlementConfig;
use crate::domain::action::{Action, ActionRequest, Phase};
use crate::domain::booking::{Booking, BookingId};
use crate::domain::charge::TripCharge;
use crate::domain::dispute::Dispute;
use crate::domain::ports::{
    BookingStore, ChargeStore, NotifierHandle, PaymentGatewayHandle, SettlementStoreHandle,
};
use crate::error::{Result, SettlementError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

/// A booking together with the settlement state an action is decided on.
#[derive(Debug, Clone)]
pub struct BookingContext {
    pub booking: Booking,
    /// Latest trip charge that has not reached a terminal status.
    pub charge: Option<TripCharge>,
    pub open_disputes: Vec<Dispute>,
}

impl BookingContext {
    /// Post-trip when the booking is waiting on settlement, or when the caller
    /// says so explicitly.
    pub fn phase(&self, post_trip_hint: Option<bool>) -> Phase {
        if post_trip_hint == Some(true) || self.booking.awaiting_settlement() {
            Phase::PostTrip
        } else {
            Phase::PreTrip
        }
    }
}

/// Entry point for admin actions on a booking.
///
/// Loads current state, decides the phase, turns the raw request into a
/// phase-scoped [`Action`], and hands it to the matching resolver. Actions on
/// the same booking are serialised so each one re-checks the state left by
/// the previous one.
pub struct VerificationRouter {
    store: SettlementStoreHandle,
    pre_trip: PreTripResolver,
    post_trip: PostTripChargeResolver,
    locks: Mutex<HashMap<BookingId, Arc<tokio::sync::Mutex<()>>>>,
}

impl VerificationRouter {
    pub fn new(
        store: SettlementStoreHandle,
        gateway: PaymentGatewayHandle,
        notifier: NotifierHandle,
        config: SettlementConfig,
    ) -> Self {
        let payments = PaymentAdapter::new(gateway, config.gateway_timeout);
        let notices = NoticeSender::new(notifier, config.notify_timeout);
        Self {
            pre_trip: PreTripResolver::new(store.clone(), payments.clone(), notices.clone(), config),
            post_trip: PostTripChargeResolver::new(store.clone(), payments, notices),
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip_all, fields(booking = %request.booking_id, action = %request.action, actor = %request.actor))]
    pub async fn handle(&self, request: ActionRequest) -> Result<ActionResponse> {
        let booking_id = request.booking_id;
        let lock = self.booking_lock(booking_id)?;
        let outcome = {
            let _guard = lock.lock().await;
            self.dispatch(request).await
        };
        self.release_lock(booking_id, lock);
        outcome
    }

    async fn dispatch(&self, request: ActionRequest) -> Result<ActionResponse> {
        let context = self.load(request.booking_id).await?;
        let phase = context.phase(request.is_post_trip);
        debug!(%phase, "routing action");

        match Action::parse(phase, &request)? {
            Action::PreTrip(action) => {
                self.pre_trip
                    .resolve(context.booking, &request.actor, action)
                    .await
            }
            Action::PostTrip(action) => {
                self.post_trip
                    .resolve(context, &request.actor, action)
                    .await
            }
        }
    }

    pub async fn load(&self, booking_id: BookingId) -> Result<BookingContext> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(SettlementError::NotFound(booking_id))?;
        let charge = self.store.latest_unresolved_charge(booking_id).await?;
        let open_disputes = self.store.open_disputes(booking_id).await?;
        Ok(BookingContext {
            booking,
            charge,
            open_disputes,
        })
    }

    fn booking_lock(&self, booking_id: BookingId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| SettlementError::internal("booking lock table poisoned"))?;
        Ok(locks.entry(booking_id).or_default().clone())
    }

    /// Drops the booking's lock once no other request holds or awaits it.
    fn release_lock(&self, booking_id: BookingId, lock: Arc<tokio::sync::Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        drop(lock);
        if locks
            .get(&booking_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&booking_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::VerificationStatus;
    use crate::infrastructure::in_memory::InMemoryStore;
    use crate::infrastructure::log_notifier::LogNotifier;
    use crate::infrastructure::simulated_gateway::SimulatedGateway;
    use uuid::Uuid;

    fn context(status: VerificationStatus) -> BookingContext {
        let mut booking = Booking::new(Uuid::new_v4(), "guest@example.com");
        booking.verification_status = status;
        BookingContext {
            booking,
            charge: None,
            open_disputes: Vec::new(),
        }
    }

    #[test]
    fn test_phase_follows_booking_state() {
        assert_eq!(context(VerificationStatus::Pending).phase(None), Phase::PreTrip);
        assert_eq!(context(VerificationStatus::PendingCharges).phase(None), Phase::PostTrip);
        assert_eq!(context(VerificationStatus::DisputeReview).phase(Some(false)), Phase::PostTrip);
        assert_eq!(context(VerificationStatus::Approved).phase(Some(true)), Phase::PostTrip);
    }

    #[tokio::test]
    async fn test_booking_locks_are_released() {
        let store = Arc::new(InMemoryStore::new());
        let router = VerificationRouter::new(
            store.clone(),
            Arc::new(SimulatedGateway::new()),
            Arc::new(LogNotifier),
            SettlementConfig::default(),
        );

        for _ in 0..3 {
            let err = router
                .handle(ActionRequest::new(Uuid::new_v4(), "admin", "approve"))
                .await
                .unwrap_err();
            assert!(matches!(err, SettlementError::NotFound(_)));
        }
        assert_eq!(router.tracked_locks(), 0);

        let booking = Booking::new(Uuid::new_v4(), "guest@example.com");
        store.store_booking(booking.clone()).await.unwrap();
        router
            .handle(ActionRequest::new(booking.id, "admin", "reject"))
            .await
            .unwrap();
        assert_eq!(router.tracked_locks(), 0);
    }
}
