//! Payment provider integration
//!
//! Checkout session creation and webhook handling against the Stripe HTTP
//! API. Subscription state itself lives in the entitlement store; this
//! module only creates redirect URLs and translates verified webhook events
//! into store updates.

pub mod checkout;
pub mod webhook;

pub use checkout::{CheckoutClient, CheckoutSession};
pub use webhook::{apply_event, verify_signature, WebhookEvent, WebhookOutcome};
