//! Requester identity and the immutable generation request.

use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, UserId};
use crate::value_objects::{ChallengeLevel, Genre, StoryLength};

/// Who is asking for content: an authenticated account or a guest session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Requester {
    User { id: UserId },
    Guest { session: SessionId },
}

impl Requester {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User {
            id: UserId::new(id),
        }
    }

    pub fn guest(session: impl Into<String>) -> Self {
        Self::Guest {
            session: SessionId::new(session),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }

    /// Stable identity string used as the rate-limit bucket key.
    ///
    /// Prefixed so a user id and a session token can never collide.
    pub fn key(&self) -> String {
        match self {
            Self::User { id } => format!("user:{}", id),
            Self::Guest { session } => format!("guest:{}", session),
        }
    }
}

/// An immutable request to generate story content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub genre: Genre,
    pub length: StoryLength,
    pub challenge: ChallengeLevel,
    pub requester: Requester,
}

impl GenerationRequest {
    pub fn new(
        genre: Genre,
        length: StoryLength,
        challenge: ChallengeLevel,
        requester: Requester,
    ) -> Self {
        Self {
            genre,
            length,
            challenge,
            requester,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_keys_cannot_collide() {
        let user = Requester::user("abc");
        let guest = Requester::guest("abc");
        assert_ne!(user.key(), guest.key());
        assert!(user.key().starts_with("user:"));
        assert!(guest.key().starts_with("guest:"));
    }

    #[test]
    fn test_is_guest() {
        assert!(!Requester::user("u1").is_guest());
        assert!(Requester::guest("s1").is_guest());
    }
}
