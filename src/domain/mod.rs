//! Domain model: bookings, trip charges, disputes, the audit trail, and the
//! ports through which the application layer reaches storage, the payment
//! gateway and the notifier.

pub mod action;
pub mod audit;
pub mod booking;
pub mod charge;
pub mod dispute;
pub mod money;
pub mod payment;
pub mod ports;
