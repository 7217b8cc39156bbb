//! Genre value object - the narrative style a story run is generated in.
//!
//! Provides type safety for genre references instead of using magic strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Story genres offered by the generator.
///
/// Horror, romance, and thriller are reserved for premium subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Fantasy,
    Mystery,
    SciFi,
    Horror,
    Romance,
    Thriller,
}

impl Genre {
    /// Returns the lowercase wire name (e.g., "fantasy", "sci-fi").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fantasy => "fantasy",
            Self::Mystery => "mystery",
            Self::SciFi => "sci-fi",
            Self::Horror => "horror",
            Self::Romance => "romance",
            Self::Thriller => "thriller",
        }
    }

    /// Returns the human-readable name (e.g., "Science Fiction").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fantasy => "Fantasy",
            Self::Mystery => "Mystery",
            Self::SciFi => "Science Fiction",
            Self::Horror => "Horror",
            Self::Romance => "Romance",
            Self::Thriller => "Thriller",
        }
    }

    /// Whether this genre requires an active premium subscription.
    pub fn is_premium(&self) -> bool {
        matches!(self, Self::Horror | Self::Romance | Self::Thriller)
    }

    /// Returns all genres in catalog order.
    pub fn all() -> [Genre; 6] {
        [
            Self::Fantasy,
            Self::Mystery,
            Self::SciFi,
            Self::Horror,
            Self::Romance,
            Self::Thriller,
        ]
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Genre {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fantasy" => Ok(Self::Fantasy),
            "mystery" => Ok(Self::Mystery),
            "sci-fi" | "scifi" | "science-fiction" => Ok(Self::SciFi),
            "horror" => Ok(Self::Horror),
            "romance" => Ok(Self::Romance),
            "thriller" => Ok(Self::Thriller),
            other => Err(DomainError::parse(format!("Unknown genre: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_as_str() {
        assert_eq!(Genre::Fantasy.as_str(), "fantasy");
        assert_eq!(Genre::SciFi.as_str(), "sci-fi");
        assert_eq!(Genre::Thriller.as_str(), "thriller");
    }

    #[test]
    fn test_genre_from_str() {
        assert_eq!(Genre::from_str("fantasy").ok(), Some(Genre::Fantasy));
        assert_eq!(Genre::from_str("SCI-FI").ok(), Some(Genre::SciFi));
        assert_eq!(Genre::from_str("scifi").ok(), Some(Genre::SciFi));
        assert!(Genre::from_str("western").is_err());
    }

    #[test]
    fn test_premium_genres() {
        assert!(!Genre::Fantasy.is_premium());
        assert!(!Genre::Mystery.is_premium());
        assert!(!Genre::SciFi.is_premium());
        assert!(Genre::Horror.is_premium());
        assert!(Genre::Romance.is_premium());
        assert!(Genre::Thriller.is_premium());
    }

    #[test]
    fn test_genre_serde_roundtrip() {
        let json = serde_json::to_string(&Genre::SciFi).expect("serialize");
        assert_eq!(json, "\"sci-fi\"");
        let parsed: Genre = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, Genre::SciFi);
    }
}
