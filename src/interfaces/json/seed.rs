use crate::domain::booking::Booking;
use crate::domain::charge::TripCharge;
use crate::domain::dispute::Dispute;
use crate::domain::ports::{BookingStore, ChargeStore, SettlementStore};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::debug;

/// Initial bookings, trip charges and disputes to load before processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub trip_charges: Vec<TripCharge>,
    #[serde(default)]
    pub disputes: Vec<Dispute>,
}

/// Counts of records written by [`Seed::load_into`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub loaded: usize,
    pub skipped: usize,
}

impl Seed {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    /// Writes the seed into `store`. Records that already exist, e.g. in a
    /// persistent store from an earlier run, are left as they are.
    pub async fn load_into(self, store: &dyn SettlementStore) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        for booking in self.bookings {
            if store.get_booking(booking.id).await?.is_some() {
                debug!(booking = %booking.id, "booking already present, keeping stored state");
                report.skipped += 1;
                continue;
            }
            store.store_booking(booking).await?;
            report.loaded += 1;
        }

        for charge in self.trip_charges {
            if store.get_charge(charge.booking_id, charge.id).await?.is_some() {
                report.skipped += 1;
                continue;
            }
            store.store_charge(charge).await?;
            report.loaded += 1;
        }

        for dispute in self.disputes {
            let existing = store.disputes_for(dispute.booking_id).await?;
            if existing.iter().any(|d| d.id == dispute.id) {
                report.skipped += 1;
                continue;
            }
            store.store_dispute(dispute).await?;
            report.loaded += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::charge::ChargeStatus;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;

    const SEED: &str = r#"{
        "bookings": [{
            "id": "6f1c1c1e-8d0a-4e43-9a53-0d9a2f1d7a11",
            "guestEmail": "guest@example.com",
            "status": "CONFIRMED",
            "verificationStatus": "PENDING_CHARGES",
            "paymentStatus": "PAID",
            "paymentMethod": {"customerRef": "cus_1", "methodRef": "pm_card"}
        }],
        "tripCharges": [{
            "id": "0b6f7c1a-3a55-4c8e-8f0e-2a4f3c2d1e01",
            "bookingId": "6f1c1c1e-8d0a-4e43-9a53-0d9a2f1d7a11",
            "mileage": "50",
            "fuel": "20",
            "total": "70",
            "chargeStatus": "PENDING",
            "createdAt": "2026-10-18T09:00:00Z"
        }]
    }"#;

    #[tokio::test]
    async fn test_seed_loads_once() {
        let store = InMemoryStore::new();

        let report = Seed::from_reader(SEED.as_bytes())
            .unwrap()
            .load_into(&store)
            .await
            .unwrap();
        assert_eq!(report, SeedReport { loaded: 2, skipped: 0 });

        let again = Seed::from_reader(SEED.as_bytes())
            .unwrap()
            .load_into(&store)
            .await
            .unwrap();
        assert_eq!(again, SeedReport { loaded: 0, skipped: 2 });

        let booking_id = "6f1c1c1e-8d0a-4e43-9a53-0d9a2f1d7a11".parse().unwrap();
        let charge = store.latest_unresolved_charge(booking_id).await.unwrap().unwrap();
        assert_eq!(charge.total.value(), dec!(70));
        assert_eq!(charge.line_items.fuel.value(), dec!(20));
        assert_eq!(charge.status, ChargeStatus::Pending);
    }
}
