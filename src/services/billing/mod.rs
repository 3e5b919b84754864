pub mod checkout;
pub mod error;
pub mod idempotency;
pub mod normalizer;
pub mod plan_resolver;
pub mod signature;
pub mod state_machine;
pub mod usage_limits;
pub mod webhook;

pub use error::BillingError;
