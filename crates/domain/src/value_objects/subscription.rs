//! Subscription tiers and quota classes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Paid subscription tier stored on a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            other => Err(DomainError::parse(format!(
                "Unknown subscription tier: {}",
                other
            ))),
        }
    }
}

/// Effective quota class of a requester once guest status and subscription
/// expiry are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Guest,
    Free,
    Premium,
}

impl AccessTier {
    /// Story generations allowed per identity per UTC day.
    ///
    /// Guest 3 / free 10 / premium 100 is the single authoritative table.
    pub fn daily_limit(&self) -> u32 {
        match self {
            Self::Guest => 3,
            Self::Free => 10,
            Self::Premium => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Premium)
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_limits() {
        assert_eq!(AccessTier::Guest.daily_limit(), 3);
        assert_eq!(AccessTier::Free.daily_limit(), 10);
        assert_eq!(AccessTier::Premium.daily_limit(), 100);
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!(
            SubscriptionTier::from_str("premium").ok(),
            Some(SubscriptionTier::Premium)
        );
        assert!(SubscriptionTier::from_str("gold").is_err());
    }
}
