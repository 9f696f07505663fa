//! Application layer containing the settlement orchestration.
//!
//! [`router::VerificationRouter`] is the entry point. It dispatches each
//! request to either the pre-trip or the post-trip resolver, which talk to the
//! payment gateway only through [`payments::PaymentAdapter`].

pub mod executor;
pub mod notify;
pub mod payments;
pub mod post_trip;
pub mod pre_trip;
pub mod response;
pub mod router;
