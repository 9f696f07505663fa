use crate::domain::audit::AuditMessage;
use crate::domain::booking::{Booking, BookingId};
use crate::domain::charge::{ChargeId, TripCharge};
use crate::domain::dispute::Dispute;
use crate::domain::payment::IdempotencyKey;
use crate::domain::ports::{
    AuditLog, BookingStore, ChargeStore, SettlementCommit, SettlementIntent, SettlementStore,
};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for booking records, keyed by booking id.
pub const CF_BOOKINGS: &str = "bookings";
/// Column Family for trip charges, keyed by `booking id ‖ charge id`.
pub const CF_TRIP_CHARGES: &str = "trip_charges";
/// Column Family for disputes, keyed by `booking id ‖ dispute id`.
pub const CF_DISPUTES: &str = "disputes";
/// Column Family for the audit trail, keyed by `booking id ‖ timestamp ‖ message id`.
pub const CF_MESSAGES: &str = "messages";
/// Column Family for settlement intents, keyed by idempotency key.
pub const CF_INTENTS: &str = "intents";

const COLUMN_FAMILIES: [&str; 5] = [CF_BOOKINGS, CF_TRIP_CHARGES, CF_DISPUTES, CF_MESSAGES, CF_INTENTS];

/// A persistent store implementation using RocksDB.
///
/// Each entity lives in its own Column Family. Records that belong to a
/// booking are keyed with the booking id as prefix so they can be listed with
/// a range scan. A [`SettlementCommit`] is written as one `WriteBatch`, so the
/// booking, the trip charge and the audit message land together or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| SettlementError::internal(format!("{name} column family not found")))
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every value whose key starts with `prefix`, in key order.
    fn scan_prefix<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn scan_all<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

fn child_key(booking_id: BookingId, id: Uuid) -> Vec<u8> {
    let mut key = booking_id.as_bytes().to_vec();
    key.extend_from_slice(id.as_bytes());
    key
}

fn message_key(message: &AuditMessage) -> Vec<u8> {
    let mut key = message.booking_id.as_bytes().to_vec();
    let micros = message.created_at.timestamp_micros().max(0) as u64;
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(message.id.as_bytes());
    key
}

#[async_trait]
impl BookingStore for RocksDBStore {
    async fn store_booking(&self, booking: Booking) -> Result<()> {
        self.put(CF_BOOKINGS, booking.id.as_bytes(), &booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        self.get(CF_BOOKINGS, id.as_bytes())
    }

    async fn all_bookings(&self) -> Result<Vec<Booking>> {
        self.scan_all(CF_BOOKINGS)
    }

    async fn store_dispute(&self, dispute: Dispute) -> Result<()> {
        self.put(CF_DISPUTES, &child_key(dispute.booking_id, dispute.id), &dispute)
    }

    async fn disputes_for(&self, booking_id: BookingId) -> Result<Vec<Dispute>> {
        let mut disputes: Vec<Dispute> = self.scan_prefix(CF_DISPUTES, booking_id.as_bytes())?;
        disputes.sort_by_key(|d| d.opened_at);
        Ok(disputes)
    }
}

#[async_trait]
impl ChargeStore for RocksDBStore {
    async fn store_charge(&self, charge: TripCharge) -> Result<()> {
        self.put(CF_TRIP_CHARGES, &child_key(charge.booking_id, charge.id), &charge)
    }

    async fn get_charge(&self, booking_id: BookingId, id: ChargeId) -> Result<Option<TripCharge>> {
        self.get(CF_TRIP_CHARGES, &child_key(booking_id, id))
    }

    async fn charges_for(&self, booking_id: BookingId) -> Result<Vec<TripCharge>> {
        let mut charges: Vec<TripCharge> = self.scan_prefix(CF_TRIP_CHARGES, booking_id.as_bytes())?;
        charges.sort_by_key(|c| c.created_at);
        Ok(charges)
    }

    async fn get_intent(&self, key: &IdempotencyKey) -> Result<Option<SettlementIntent>> {
        self.get(CF_INTENTS, key.as_str().as_bytes())
    }

    async fn reserve_intent(&self, intent: SettlementIntent) -> Result<()> {
        self.put(CF_INTENTS, intent.key.as_str().as_bytes(), &intent)
    }
}

#[async_trait]
impl AuditLog for RocksDBStore {
    async fn append(&self, message: AuditMessage) -> Result<()> {
        self.put(CF_MESSAGES, &message_key(&message), &message)
    }

    async fn messages_for(&self, booking_id: BookingId) -> Result<Vec<AuditMessage>> {
        self.scan_prefix(CF_MESSAGES, booking_id.as_bytes())
    }
}

#[async_trait]
impl SettlementStore for RocksDBStore {
    async fn commit(&self, commit: SettlementCommit) -> Result<()> {
        let mut batch = WriteBatch::default();

        let booking = &commit.booking;
        batch.put_cf(self.cf(CF_BOOKINGS)?, booking.id.as_bytes(), serde_json::to_vec(booking)?);
        if let Some(charge) = &commit.charge {
            batch.put_cf(
                self.cf(CF_TRIP_CHARGES)?,
                child_key(charge.booking_id, charge.id),
                serde_json::to_vec(charge)?,
            );
        }
        for dispute in &commit.disputes {
            batch.put_cf(
                self.cf(CF_DISPUTES)?,
                child_key(dispute.booking_id, dispute.id),
                serde_json::to_vec(dispute)?,
            );
        }
        if let Some(intent) = &commit.intent {
            batch.put_cf(
                self.cf(CF_INTENTS)?,
                intent.key.as_str().as_bytes(),
                serde_json::to_vec(intent)?,
            );
        }
        batch.put_cf(
            self.cf(CF_MESSAGES)?,
            message_key(&commit.message),
            serde_json::to_vec(&commit.message)?,
        );

        self.db.write(batch)?;
        Ok(())
    }
}
