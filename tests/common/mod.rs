#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use trip_settlement::application::router::VerificationRouter;
use trip_settlement::config::SettlementConfig;
use trip_settlement::domain::booking::{Booking, BookingStatus, PaymentStatus, VerificationStatus};
use trip_settlement::domain::charge::{ChargeAdjustment, ChargeCategory, LineItems, TripCharge};
use trip_settlement::domain::dispute::{Dispute, DisputeStatus};
use trip_settlement::domain::money::Money;
use trip_settlement::domain::payment::{
    AdjustedCharge, CaptureResult, FeeCharge, GatewayCharge, GatewayError, PaymentMethod,
    WaiverRequest, WaiverSplit,
};
use trip_settlement::domain::ports::{
    BookingStore, ChargeStore, Notification, Notifier, NotifierError, NotifierHandle, PaymentGateway,
    PaymentGatewayHandle, SettlementStoreHandle,
};
use trip_settlement::infrastructure::in_memory::InMemoryStore;
use trip_settlement::infrastructure::simulated_gateway::SimulatedGateway;
use uuid::Uuid;

pub const ADMIN: &str = "admin@fleet.example";

pub fn money(value: Decimal) -> Money {
    Money::new(value).unwrap()
}

pub fn card(method_ref: &str) -> PaymentMethod {
    PaymentMethod {
        customer_ref: "cus_guest".to_string(),
        method_ref: method_ref.to_string(),
    }
}

/// A confirmed booking whose trip has ended and whose charges await a decision.
pub fn finished_trip(method: Option<PaymentMethod>) -> Booking {
    let mut booking = Booking::new(Uuid::new_v4(), "guest@example.com");
    booking.status = BookingStatus::Confirmed;
    booking.verification_status = VerificationStatus::PendingCharges;
    booking.payment_status = PaymentStatus::Paid;
    booking.payment_method = method;
    booking
}

/// A reservation waiting on pre-trip verification.
pub fn awaiting_verification(payment_intent_ref: Option<&str>) -> Booking {
    let mut booking = Booking::new(Uuid::new_v4(), "guest@example.com");
    booking.payment_method = Some(card("pm_card_visa"));
    booking.payment_intent_ref = payment_intent_ref.map(str::to_string);
    booking
}

pub fn mileage_and_fuel(booking: &Booking, mileage: Decimal, fuel: Decimal) -> TripCharge {
    let items = LineItems {
        mileage: money(mileage),
        fuel: money(fuel),
        ..Default::default()
    };
    TripCharge::new(booking.id, items, Utc::now())
}

pub fn open_dispute(booking: &Booking, charge: &TripCharge) -> Dispute {
    Dispute {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        charge_id: Some(charge.id),
        status: DisputeStatus::Open,
        reason: Some("fuel was full on return".to_string()),
        opened_at: Utc::now(),
        reviewed_by: None,
        reviewed_at: None,
    }
}

pub fn adjustment(category: ChargeCategory, original: Decimal, adjusted: Decimal, included: bool) -> ChargeAdjustment {
    ChargeAdjustment {
        category,
        original_amount: money(original),
        adjusted_amount: money(adjusted),
        included,
        reason: None,
    }
}

/// Router wired to an in-memory store, with handles kept for inspection.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<CountingGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub router: VerificationRouter,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingNotifier::default(), SettlementConfig::default())
    }

    pub fn with(notifier: RecordingNotifier, config: SettlementConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(CountingGateway::default());
        let notifier = Arc::new(notifier);

        let store_handle: SettlementStoreHandle = store.clone();
        let gateway_handle: PaymentGatewayHandle = gateway.clone();
        let notifier_handle: NotifierHandle = notifier.clone();
        let router = VerificationRouter::new(store_handle, gateway_handle, notifier_handle, config);

        Self {
            store,
            gateway,
            notifier,
            router,
        }
    }

    pub fn with_gateway_timeout(timeout: Duration) -> Self {
        Self::with(
            RecordingNotifier::default(),
            SettlementConfig::default().with_gateway_timeout(timeout),
        )
    }

    pub async fn seed(&self, booking: &Booking, charge: Option<&TripCharge>) {
        self.store.store_booking(booking.clone()).await.unwrap();
        if let Some(charge) = charge {
            self.store.store_charge(charge.clone()).await.unwrap();
        }
    }

    pub async fn booking(&self, booking: &Booking) -> Booking {
        self.store.get_booking(booking.id).await.unwrap().unwrap()
    }

    pub async fn charge(&self, charge: &TripCharge) -> TripCharge {
        self.store
            .get_charge(charge.booking_id, charge.id)
            .await
            .unwrap()
            .unwrap()
    }
}

/// Simulated gateway that also counts how often each operation was called.
#[derive(Default)]
pub struct CountingGateway {
    pub inner: SimulatedGateway,
    pub charge_calls: AtomicUsize,
    pub adjust_calls: AtomicUsize,
    pub waive_calls: AtomicUsize,
}

impl CountingGateway {
    pub fn charge_calls(&self) -> usize {
        self.charge_calls.load(Ordering::SeqCst) + self.adjust_calls.load(Ordering::SeqCst)
    }

    /// Sum of every successful charge, in minor units.
    pub async fn collected_minor_units(&self) -> i64 {
        self.inner
            .charges()
            .await
            .iter()
            .map(|c| c.amount_minor_units)
            .sum()
    }
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn charge_additional_fees(&self, charge: FeeCharge) -> Result<GatewayCharge, GatewayError> {
        self.charge_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.charge_additional_fees(charge).await
    }

    async fn waive_charges(&self, request: WaiverRequest) -> Result<WaiverSplit, GatewayError> {
        self.waive_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.waive_charges(request).await
    }

    async fn adjust_and_charge(&self, charge: AdjustedCharge) -> Result<GatewayCharge, GatewayError> {
        self.adjust_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.adjust_and_charge(charge).await
    }

    async fn confirm_and_capture_payment(
        &self,
        payment_intent_ref: &str,
        method_ref: Option<&str>,
    ) -> Result<CaptureResult, GatewayError> {
        self.inner
            .confirm_and_capture_payment(payment_intent_ref, method_ref)
            .await
    }

    async fn cancel_payment(&self, payment_intent_ref: &str) -> Result<(), GatewayError> {
        self.inner.cancel_payment(payment_intent_ref).await
    }
}

/// Notifier that records what it was asked to send, and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub sent: std::sync::Mutex<Vec<(String, Notification)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn kinds(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, _)| kind.clone())
            .collect()
    }

    fn record(&self, kind: &str, payload: Notification) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push((kind.to_string(), payload));
        if self.fail {
            return Err(NotifierError("smtp relay unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_booking_approved(&self, _email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.record("booking_approved", payload)
    }

    async fn send_booking_rejected(&self, _email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.record("booking_rejected", payload)
    }

    async fn send_charges_processed(&self, _email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.record("charges_processed", payload)
    }

    async fn send_charges_waived(&self, _email: &str, payload: Notification) -> Result<(), NotifierError> {
        self.record("charges_waived", payload)
    }
}

/// Writes a seed file and a requests file for CLI runs.
pub fn write_inputs(dir: &Path, seed: &serde_json::Value, requests: &[serde_json::Value]) -> (std::path::PathBuf, std::path::PathBuf) {
    let seed_path = dir.join("seed.json");
    std::fs::write(&seed_path, serde_json::to_vec_pretty(seed).unwrap()).unwrap();

    let requests_path = dir.join("requests.jsonl");
    let lines: Vec<String> = requests.iter().map(|r| r.to_string()).collect();
    std::fs::write(&requests_path, lines.join("\n")).unwrap();

    (seed_path, requests_path)
}
