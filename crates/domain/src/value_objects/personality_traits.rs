//! Personality traits value object.
//!
//! Five axes tracked across a story run, each held in [0, 100]. The set is
//! always complete - there is no notion of a partially-known profile.

use serde::{Deserialize, Serialize};

/// Lowest value a trait can take.
pub const TRAIT_MIN: u8 = 0;
/// Highest value a trait can take.
pub const TRAIT_MAX: u8 = 100;
/// Starting value for every trait on a fresh run.
pub const TRAIT_NEUTRAL: u8 = 50;

/// The five personality axes shaped by the player's choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityTraits {
    pub risk_taking: u8,
    pub empathy: u8,
    pub pragmatism: u8,
    pub creativity: u8,
    pub leadership: u8,
}

impl PersonalityTraits {
    /// All five axes at the neutral midpoint.
    pub fn neutral() -> Self {
        Self {
            risk_taking: TRAIT_NEUTRAL,
            empathy: TRAIT_NEUTRAL,
            pragmatism: TRAIT_NEUTRAL,
            creativity: TRAIT_NEUTRAL,
            leadership: TRAIT_NEUTRAL,
        }
    }

    /// Construct from raw integers, clamping each axis into [0, 100].
    pub fn from_clamped(
        risk_taking: i64,
        empathy: i64,
        pragmatism: i64,
        creativity: i64,
        leadership: i64,
    ) -> Self {
        Self {
            risk_taking: clamp_trait(risk_taking),
            empathy: clamp_trait(empathy),
            pragmatism: clamp_trait(pragmatism),
            creativity: clamp_trait(creativity),
            leadership: clamp_trait(leadership),
        }
    }

    /// The canonical wire names of the five axes.
    pub fn axis_names() -> [&'static str; 5] {
        ["riskTaking", "empathy", "pragmatism", "creativity", "leadership"]
    }

    /// Read an axis by wire name.
    pub fn get(&self, axis: &str) -> Option<u8> {
        match axis {
            "riskTaking" => Some(self.risk_taking),
            "empathy" => Some(self.empathy),
            "pragmatism" => Some(self.pragmatism),
            "creativity" => Some(self.creativity),
            "leadership" => Some(self.leadership),
            _ => None,
        }
    }

    /// Apply a signed delta to an axis, clamping into [0, 100].
    ///
    /// Unknown axis names are ignored - a model inventing a sixth trait must
    /// not corrupt the profile.
    pub fn apply_impact(&mut self, axis: &str, delta: i32) {
        let slot = match axis {
            "riskTaking" => &mut self.risk_taking,
            "empathy" => &mut self.empathy,
            "pragmatism" => &mut self.pragmatism,
            "creativity" => &mut self.creativity,
            "leadership" => &mut self.leadership,
            _ => return,
        };
        *slot = clamp_trait(i64::from(*slot) + i64::from(delta));
    }

    /// True when every axis is within [0, 100]. Always holds for values built
    /// through this type; useful when checking decoded wire data.
    pub fn in_range(&self) -> bool {
        // u8 already bounds below at 0
        [
            self.risk_taking,
            self.empathy,
            self.pragmatism,
            self.creativity,
            self.leadership,
        ]
        .iter()
        .all(|v| *v <= TRAIT_MAX)
    }
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self::neutral()
    }
}

fn clamp_trait(value: i64) -> u8 {
    value.clamp(i64::from(TRAIT_MIN), i64::from(TRAIT_MAX)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_is_all_fifty() {
        let traits = PersonalityTraits::neutral();
        for axis in PersonalityTraits::axis_names() {
            assert_eq!(traits.get(axis), Some(TRAIT_NEUTRAL));
        }
    }

    #[test]
    fn test_from_clamped_bounds() {
        let traits = PersonalityTraits::from_clamped(-10, 250, 50, 0, 100);
        assert_eq!(traits.risk_taking, 0);
        assert_eq!(traits.empathy, 100);
        assert_eq!(traits.pragmatism, 50);
        assert_eq!(traits.creativity, 0);
        assert_eq!(traits.leadership, 100);
    }

    #[test]
    fn test_apply_impact_clamps() {
        let mut traits = PersonalityTraits::neutral();
        traits.apply_impact("empathy", 75);
        assert_eq!(traits.empathy, 100);
        traits.apply_impact("empathy", -200);
        assert_eq!(traits.empathy, 0);
    }

    #[test]
    fn test_apply_impact_ignores_unknown_axis() {
        let mut traits = PersonalityTraits::neutral();
        traits.apply_impact("charisma", 30);
        assert_eq!(traits, PersonalityTraits::neutral());
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(PersonalityTraits::neutral()).expect("serialize");
        assert_eq!(json["riskTaking"], 50);
        assert_eq!(json["leadership"], 50);
    }
}
