//! Story length value object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// How long a story run is expected to go before steering toward an ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Quick,
    Standard,
    Extended,
}

impl StoryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::Extended => "extended",
        }
    }

    /// Target number of steps the prompt steers the narrative toward.
    pub fn target_steps(&self) -> u32 {
        match self {
            Self::Quick => 5,
            Self::Standard => 10,
            Self::Extended => 20,
        }
    }

    /// Whether this length requires an active premium subscription.
    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Extended)
    }
}

impl fmt::Display for StoryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoryLength {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "extended" => Ok(Self::Extended),
            other => Err(DomainError::parse(format!("Unknown story length: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_from_str() {
        assert_eq!(StoryLength::from_str("quick").ok(), Some(StoryLength::Quick));
        assert_eq!(
            StoryLength::from_str("Extended").ok(),
            Some(StoryLength::Extended)
        );
        assert!(StoryLength::from_str("epic").is_err());
    }

    #[test]
    fn test_only_extended_is_premium() {
        assert!(!StoryLength::Quick.is_premium());
        assert!(!StoryLength::Standard.is_premium());
        assert!(StoryLength::Extended.is_premium());
    }

    #[test]
    fn test_target_steps_increase_with_length() {
        assert!(StoryLength::Quick.target_steps() < StoryLength::Standard.target_steps());
        assert!(StoryLength::Standard.target_steps() < StoryLength::Extended.target_steps());
    }
}
