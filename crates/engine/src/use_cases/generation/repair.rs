//! Repair heuristics for malformed response fragments.
//!
//! Repairs are purely additive/substitutive: they synthesize structural
//! scaffolding (ids, slugs, placeholders, defaults) but never invent
//! narrative content. Every repaired fragment is re-validated before it is
//! accepted, and callers surface a notice so a repaired response is never
//! mistaken for a pristine one.

use serde_json::Value;

use storyforge_domain::{
    Choice, GameState, PersonalityTraits, CHOICE_ID_MAX_LEN, TRAIT_NEUTRAL,
};

/// Alternate field names the model has been seen using for choice text.
const CHOICE_TEXT_FALLBACKS: [&str; 4] = ["choiceText", "label", "description", "option"];

/// Attempt to synthesize a valid choice from a malformed one.
///
/// Missing id -> letter at the positional index (0 -> "A"); missing text ->
/// first usable alternate field, then `"Choice N"`; missing slug ->
/// `"choice_N"` (N = index + 1). Returns `None` when the synthesized choice
/// still fails validation. Never panics.
pub fn repair_choice(raw: &Value, index: usize) -> Option<Choice> {
    let map = raw.as_object()?;

    let id = match map.get("id").and_then(Value::as_str) {
        Some(s) if !s.is_empty() && s.len() <= CHOICE_ID_MAX_LEN => s.to_string(),
        _ => Choice::letter_for_index(index),
    };

    let text = non_empty_str(map.get("text"))
        .or_else(|| {
            CHOICE_TEXT_FALLBACKS
                .iter()
                .find_map(|field| non_empty_str(map.get(*field)))
        })
        .unwrap_or_else(|| format!("Choice {}", index + 1));

    let slug = non_empty_str(map.get("slug")).unwrap_or_else(|| format!("choice_{}", index + 1));

    let consequences = match map.get("consequences") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let trait_impacts = match map.get("traitImpacts") {
        Some(Value::Object(entries)) => entries
            .iter()
            .filter_map(|(axis, delta)| delta.as_i64().map(|d| (axis.clone(), d as i32)))
            .collect(),
        _ => std::collections::BTreeMap::new(),
    };

    let choice = Choice {
        id,
        text,
        slug,
        consequences,
        trait_impacts,
    };

    choice.validate().ok()?;
    Some(choice)
}

/// Attempt to rebuild a valid game state from a malformed object.
///
/// Every missing or malformed field is replaced by a safe default: act 1,
/// empty flags/inventory/relationships, all traits at the neutral midpoint.
/// Out-of-range trait numbers are clamped rather than discarded. A value
/// that is not a JSON object at all is unrepairable.
pub fn repair_game_state(raw: &Value) -> Option<GameState> {
    let map = raw.as_object()?;

    let act = match map.get("act").and_then(Value::as_u64) {
        Some(act) if act >= 1 && act <= u64::from(u32::MAX) => act as u32,
        _ => 1,
    };

    let flags: Vec<String> = match map.get("flags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let relationships = match map.get("relationships") {
        Some(Value::Object(entries)) => entries
            .iter()
            .filter_map(|(name, score)| score.as_i64().map(|s| (name.clone(), s as i32)))
            .collect(),
        _ => std::collections::BTreeMap::new(),
    };

    let inventory: Vec<String> = match map.get("inventory") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let personality_traits = match map.get("personalityTraits") {
        Some(Value::Object(entries)) => {
            let axis = |name: &str| {
                entries
                    .get(name)
                    .and_then(Value::as_i64)
                    .unwrap_or(i64::from(TRAIT_NEUTRAL))
            };
            PersonalityTraits::from_clamped(
                axis("riskTaking"),
                axis("empathy"),
                axis("pragmatism"),
                axis("creativity"),
                axis("leadership"),
            )
        }
        _ => PersonalityTraits::neutral(),
    };

    let mut state = GameState {
        act,
        flags: Vec::new(),
        relationships,
        inventory,
        personality_traits,
    };
    for flag in flags {
        state.add_flag(flag);
    }

    state.validate().ok()?;
    Some(state)
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
