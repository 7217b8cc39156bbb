//! Challenge level value object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// How punishing the generated narrative should be toward the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeLevel {
    Casual,
    Challenging,
}

impl ChallengeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Challenging => "challenging",
        }
    }
}

impl fmt::Display for ChallengeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChallengeLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "casual" => Ok(Self::Casual),
            "challenging" => Ok(Self::Challenging),
            other => Err(DomainError::parse(format!(
                "Unknown challenge level: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_level_from_str() {
        assert_eq!(
            ChallengeLevel::from_str("casual").ok(),
            Some(ChallengeLevel::Casual)
        );
        assert_eq!(
            ChallengeLevel::from_str("Challenging").ok(),
            Some(ChallengeLevel::Challenging)
        );
        assert!(ChallengeLevel::from_str("brutal").is_err());
    }
}
