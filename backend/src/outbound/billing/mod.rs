//! Billing provider outbound adapters.
//!
//! A thin Stripe REST implementation of the `BillingGateway` port.

mod dto;
mod stripe_gateway;

pub use stripe_gateway::{DEFAULT_STRIPE_API_BASE, StripeBillingGateway};
