//! Premium feature gating for genres and story length.

use std::sync::Arc;

use serde::Serialize;

use storyforge_domain::{AccessTier, Genre, Requester, StoryLength};

use crate::infrastructure::ports::{ClockPort, UserProfileRepo};

/// Machine-readable reason a request was turned away at the feature gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    PremiumGenreRequired,
    PremiumLengthRequired,
    PremiumExpired,
}

impl DenialReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::PremiumGenreRequired => "premium_genre_required",
            Self::PremiumLengthRequired => "premium_length_required",
            Self::PremiumExpired => "premium_expired",
        }
    }
}

/// Outcome of a feature-gate check. Independent of the daily counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: DenialReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Gates premium-only genres and lengths behind an active subscription.
pub struct FeatureGate {
    profiles: Arc<dyn UserProfileRepo>,
    clock: Arc<dyn ClockPort>,
}

impl FeatureGate {
    pub fn new(profiles: Arc<dyn UserProfileRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { profiles, clock }
    }

    /// Resolve a requester's effective quota class.
    ///
    /// A profile-store error resolves to Free: entitlement checks fail
    /// CLOSED, unlike the quota counter, because granting paid features on a
    /// storage error would leak entitlements.
    pub async fn resolve_tier(&self, requester: &Requester) -> AccessTier {
        match requester {
            Requester::Guest { .. } => AccessTier::Guest,
            Requester::User { id } => match self.profiles.get(id).await {
                Ok(Some(profile)) => profile.access_tier(self.clock.now()),
                Ok(None) => AccessTier::Free,
                Err(e) => {
                    tracing::warn!(
                        user_id = %id,
                        error = %e,
                        "Profile lookup failed, treating as free tier"
                    );
                    AccessTier::Free
                }
            },
        }
    }

    /// Check whether the requester may generate with this genre and length.
    pub async fn validate_story_request(
        &self,
        requester: &Requester,
        genre: Genre,
        length: StoryLength,
    ) -> AccessDecision {
        let wanted = if genre.is_premium() {
            Some(DenialReason::PremiumGenreRequired)
        } else if length.is_premium() {
            Some(DenialReason::PremiumLengthRequired)
        } else {
            None
        };

        let Some(denial) = wanted else {
            return AccessDecision::allow();
        };

        match requester {
            Requester::Guest { .. } => AccessDecision::deny(denial),
            Requester::User { id } => match self.profiles.get(id).await {
                Ok(Some(profile)) => {
                    let now = self.clock.now();
                    if profile.has_active_premium(now) {
                        AccessDecision::allow()
                    } else if profile.subscription_tier
                        == storyforge_domain::SubscriptionTier::Premium
                    {
                        // Had premium, but it lapsed.
                        AccessDecision::deny(DenialReason::PremiumExpired)
                    } else {
                        AccessDecision::deny(denial)
                    }
                }
                Ok(None) => AccessDecision::deny(denial),
                Err(e) => {
                    tracing::warn!(
                        user_id = %id,
                        error = %e,
                        "Profile lookup failed, denying premium feature"
                    );
                    AccessDecision::deny(denial)
                }
            },
        }
    }
}
