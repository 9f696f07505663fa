use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trip_settlement::domain::audit::{AuditEvent, AuditMessage};
use trip_settlement::domain::booking::Booking;
use trip_settlement::domain::charge::{ChargeStatus, LineItems, TripCharge};
use trip_settlement::domain::money::Money;
use trip_settlement::domain::ports::{
    AuditLog, BookingStore, ChargeStore, SettlementCommit, SettlementStoreHandle,
};
use trip_settlement::infrastructure::in_memory::InMemoryStore;
use uuid::Uuid;

#[tokio::test]
async fn test_store_as_trait_object() {
    let store: SettlementStoreHandle = Arc::new(InMemoryStore::new());

    let booking = Booking::new(Uuid::new_v4(), "guest@example.com");
    let items = LineItems {
        cleaning: Money::new(dec!(45)).unwrap(),
        ..Default::default()
    };
    let mut charge = TripCharge::new(booking.id, items, Utc::now());

    // Verify Send + Sync by spawning tasks
    let writer = store.clone();
    let seeded = booking.clone();
    let seeded_charge = charge.clone();
    tokio::spawn(async move {
        writer.store_booking(seeded).await.unwrap();
        writer.store_charge(seeded_charge).await.unwrap();
    })
    .await
    .unwrap();

    charge.status = ChargeStatus::FullyWaived;
    let message = AuditMessage::new(
        booking.id,
        Some(charge.id),
        "admin",
        Utc::now(),
        AuditEvent::ChargesWaived {
            amount: charge.total,
            reason: "goodwill".into(),
        },
    );
    let committer = store.clone();
    let committed = charge.clone();
    let owner = booking.clone();
    tokio::spawn(async move {
        committer
            .commit(SettlementCommit::new(owner, message).with_charge(committed))
            .await
            .unwrap();
    })
    .await
    .unwrap();

    assert!(store.latest_unresolved_charge(booking.id).await.unwrap().is_none());
    assert_eq!(store.messages_for(booking.id).await.unwrap().len(), 1);
    assert_eq!(store.all_bookings().await.unwrap(), vec![booking]);
}
