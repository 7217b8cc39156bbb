//! Report remaining daily quota without consuming it.

use std::sync::Arc;

use serde::Serialize;

use storyforge_domain::{AccessTier, Requester};

use crate::use_cases::gate::{FeatureGate, RateLimitDecision, RateLimiter};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatusOutput {
    pub tier: AccessTier,
    #[serde(flatten)]
    pub decision: RateLimitDecision,
}

pub struct QuotaStatus {
    gate: Arc<FeatureGate>,
    limiter: Arc<RateLimiter>,
}

impl QuotaStatus {
    pub fn new(gate: Arc<FeatureGate>, limiter: Arc<RateLimiter>) -> Self {
        Self { gate, limiter }
    }

    pub async fn execute(&self, requester: &Requester) -> QuotaStatusOutput {
        let tier = self.gate.resolve_tier(requester).await;
        let decision = self.limiter.status(requester, tier).await;
        QuotaStatusOutput { tier, decision }
    }
}
