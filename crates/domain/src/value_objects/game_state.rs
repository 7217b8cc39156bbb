//! Game state value object - the evolving state of a story run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::PersonalityTraits;

/// Mutable state carried across the steps of a story run.
///
/// Owned by the run; only `StoryRun::apply_response` mutates it, and flags
/// are append-only for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Current narrative act, starting at 1.
    pub act: u32,
    /// Ordered, de-duplicated story flags. Append-only across a run.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Named character -> relationship score.
    #[serde(default)]
    pub relationships: BTreeMap<String, i32>,
    /// Item identifiers currently held.
    #[serde(default)]
    pub inventory: Vec<String>,
    pub personality_traits: PersonalityTraits,
}

impl GameState {
    /// Fresh state for a new run: act 1, nothing collected, neutral traits.
    pub fn initial() -> Self {
        Self {
            act: 1,
            flags: Vec::new(),
            relationships: BTreeMap::new(),
            inventory: Vec::new(),
            personality_traits: PersonalityTraits::neutral(),
        }
    }

    /// Add a flag if not already present, preserving insertion order.
    pub fn add_flag(&mut self, flag: impl Into<String>) {
        let flag = flag.into();
        if !self.flags.iter().any(|f| *f == flag) {
            self.flags.push(flag);
        }
    }

    /// Merge a newer state into this one, keeping flags append-only.
    ///
    /// Act, relationships, inventory, and traits take the incoming values;
    /// incoming flags are unioned with the existing set so a response that
    /// drops flags cannot erase run history.
    pub fn merge_from(&mut self, incoming: GameState) {
        self.act = incoming.act.max(1);
        for flag in incoming.flags {
            self.add_flag(flag);
        }
        self.relationships = incoming.relationships;
        self.inventory = incoming.inventory;
        self.personality_traits = incoming.personality_traits;
    }

    /// Check the structural invariants on an already-constructed state.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.act < 1 {
            return Err(DomainError::validation("act must be at least 1"));
        }
        if !self.personality_traits.in_range() {
            return Err(DomainError::validation(
                "personality traits must be within 0-100",
            ));
        }
        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = GameState::initial();
        assert_eq!(state.act, 1);
        assert!(state.flags.is_empty());
        assert!(state.inventory.is_empty());
        assert!(state.relationships.is_empty());
        assert_eq!(state.personality_traits, PersonalityTraits::neutral());
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_add_flag_dedupes() {
        let mut state = GameState::initial();
        state.add_flag("met_the_hermit");
        state.add_flag("met_the_hermit");
        state.add_flag("found_the_map");
        assert_eq!(state.flags, vec!["met_the_hermit", "found_the_map"]);
    }

    #[test]
    fn test_merge_keeps_flags_append_only() {
        let mut state = GameState::initial();
        state.add_flag("met_the_hermit");

        let mut incoming = GameState::initial();
        incoming.act = 2;
        incoming.add_flag("found_the_map");
        incoming.inventory.push("rusty_key".to_string());

        state.merge_from(incoming);
        assert_eq!(state.act, 2);
        // The hermit flag survives even though the incoming state lacked it.
        assert_eq!(state.flags, vec!["met_the_hermit", "found_the_map"]);
        assert_eq!(state.inventory, vec!["rusty_key"]);
    }

    #[test]
    fn test_merge_floors_act_at_one() {
        let mut state = GameState::initial();
        state.act = 3;
        let mut incoming = GameState::initial();
        incoming.act = 0;
        state.merge_from(incoming);
        assert_eq!(state.act, 1);
    }

    #[test]
    fn test_serde_camel_case() {
        let state = GameState::initial();
        let json = serde_json::to_value(&state).expect("serialize");
        assert_eq!(json["act"], 1);
        assert!(json["personalityTraits"].is_object());
    }
}
