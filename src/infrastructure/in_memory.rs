use crate::domain::audit::AuditMessage;
use crate::domain::booking::{Booking, BookingId};
use crate::domain::charge::{ChargeId, TripCharge};
use crate::domain::dispute::{Dispute, DisputeId};
use crate::domain::payment::IdempotencyKey;
use crate::domain::ports::{
    AuditLog, BookingStore, ChargeStore, SettlementCommit, SettlementIntent, SettlementStore,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    bookings: HashMap<BookingId, Booking>,
    charges: HashMap<ChargeId, TripCharge>,
    disputes: HashMap<DisputeId, Dispute>,
    messages: Vec<AuditMessage>,
    intents: HashMap<IdempotencyKey, SettlementIntent>,
}

/// A thread-safe in-memory settlement store.
///
/// All tables sit behind a single `RwLock`, so a [`SettlementCommit`] is
/// applied under one write guard and readers never observe half of it.
/// Ideal for testing or for runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn store_booking(&self, booking: Booking) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.get(&id).cloned())
    }

    async fn all_bookings(&self) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.values().cloned().collect())
    }

    async fn store_dispute(&self, dispute: Dispute) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.disputes.insert(dispute.id, dispute);
        Ok(())
    }

    async fn disputes_for(&self, booking_id: BookingId) -> Result<Vec<Dispute>> {
        let tables = self.tables.read().await;
        let mut disputes: Vec<Dispute> = tables
            .disputes
            .values()
            .filter(|d| d.booking_id == booking_id)
            .cloned()
            .collect();
        disputes.sort_by_key(|d| d.opened_at);
        Ok(disputes)
    }
}

#[async_trait]
impl ChargeStore for InMemoryStore {
    async fn store_charge(&self, charge: TripCharge) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.charges.insert(charge.id, charge);
        Ok(())
    }

    async fn get_charge(&self, booking_id: BookingId, id: ChargeId) -> Result<Option<TripCharge>> {
        let tables = self.tables.read().await;
        Ok(tables
            .charges
            .get(&id)
            .filter(|c| c.booking_id == booking_id)
            .cloned())
    }

    async fn charges_for(&self, booking_id: BookingId) -> Result<Vec<TripCharge>> {
        let tables = self.tables.read().await;
        let mut charges: Vec<TripCharge> = tables
            .charges
            .values()
            .filter(|c| c.booking_id == booking_id)
            .cloned()
            .collect();
        charges.sort_by_key(|c| c.created_at);
        Ok(charges)
    }

    async fn get_intent(&self, key: &IdempotencyKey) -> Result<Option<SettlementIntent>> {
        let tables = self.tables.read().await;
        Ok(tables.intents.get(key).cloned())
    }

    async fn reserve_intent(&self, intent: SettlementIntent) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.intents.insert(intent.key.clone(), intent);
        Ok(())
    }
}

#[async_trait]
impl AuditLog for InMemoryStore {
    async fn append(&self, message: AuditMessage) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.messages.push(message);
        Ok(())
    }

    async fn messages_for(&self, booking_id: BookingId) -> Result<Vec<AuditMessage>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettlementStore for InMemoryStore {
    async fn commit(&self, commit: SettlementCommit) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.bookings.insert(commit.booking.id, commit.booking);
        if let Some(charge) = commit.charge {
            tables.charges.insert(charge.id, charge);
        }
        for dispute in commit.disputes {
            tables.disputes.insert(dispute.id, dispute);
        }
        if let Some(intent) = commit.intent {
            tables.intents.insert(intent.key.clone(), intent);
        }
        tables.messages.push(commit.message);
        Ok(())
    }
}
