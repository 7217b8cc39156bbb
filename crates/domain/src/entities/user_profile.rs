//! User profile entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::value_objects::{AccessTier, SubscriptionTier};

/// An authenticated user's account profile.
///
/// Only the fields this engine consults; the auth provider owns the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub subscription_tier: SubscriptionTier,
    /// When the premium entitlement lapses. `None` for free accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn free(id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            subscription_tier: SubscriptionTier::Free,
            premium_expires_at: None,
            created_at: now,
        }
    }

    pub fn premium(id: UserId, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            subscription_tier: SubscriptionTier::Premium,
            premium_expires_at: Some(expires_at),
            created_at: now,
        }
    }

    /// Whether the premium entitlement is active at `now`.
    ///
    /// A premium tier with no expiry recorded counts as lapsed - the billing
    /// integration always writes one.
    pub fn has_active_premium(&self, now: DateTime<Utc>) -> bool {
        self.subscription_tier == SubscriptionTier::Premium
            && self.premium_expires_at.is_some_and(|exp| exp > now)
    }

    /// Effective quota class at `now`.
    pub fn access_tier(&self, now: DateTime<Utc>) -> AccessTier {
        if self.has_active_premium(now) {
            AccessTier::Premium
        } else {
            AccessTier::Free
        }
    }
}
