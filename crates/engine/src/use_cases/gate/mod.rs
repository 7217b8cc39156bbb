//! Rate limiting and premium feature gating.

pub mod feature_gate;
pub mod rate_limiter;

pub use feature_gate::{AccessDecision, DenialReason, FeatureGate};
pub use rate_limiter::{RateLimitDecision, RateLimiter};
