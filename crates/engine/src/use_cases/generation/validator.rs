//! Structural validation of candidate story responses.
//!
//! The model's payload arrives as untyped JSON. Validation is strict-first:
//! decode against the exact StoryResponse shape, collecting one message per
//! violation. Malformed choices and game state then get one repair pass
//! (see `repair`); everything else fails as-is.
//!
//! Message wording is load-bearing: the retry classifier decides whether a
//! failed attempt is worth re-running by matching these strings, so missing
//! fields and type mismatches use the "Required" / "Expected X, received Y"
//! vocabulary while bounds violations deliberately do not.

use serde_json::Value;

use storyforge_domain::{
    Choice, GameState, PersonalityTraits, StoryResponse, CHOICES_MAX, CHOICES_MIN,
    CHOICE_ID_MAX_LEN, CHOICE_SLUG_MAX_LEN, CHOICE_TEXT_MAX_LEN, STORY_TEXT_MAX_LEN, TRAIT_MAX,
};

use crate::use_cases::generation::repair::{repair_choice, repair_game_state};

/// Outcome of validating an untyped value against a target shape.
///
/// `success` and a non-empty `errors` list can coexist only for repair
/// notices, and then `can_retry` is always false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub errors: Vec<String>,
    pub can_retry: bool,
}

impl<T> ValidationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: Vec::new(),
            can_retry: false,
        }
    }

    /// Success reached through the repair path; `notices` tells the caller
    /// what was reconstructed.
    pub fn repaired(data: T, notices: Vec<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: notices,
            can_retry: false,
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        let can_retry = is_retryable(&errors);
        Self {
            success: false,
            data: None,
            errors,
            can_retry,
        }
    }
}

/// Error-message fragments that mark a failure as worth retrying.
const RETRYABLE_PATTERNS: [&str; 7] = [
    "Required",
    "Expected string",
    "Expected number",
    "Expected array",
    "Expected object",
    "Expected boolean",
    "Invalid type",
];

/// Whether any message in the list matches a retryable pattern.
pub fn is_retryable(errors: &[String]) -> bool {
    errors
        .iter()
        .any(|e| RETRYABLE_PATTERNS.iter().any(|p| e.contains(p)))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        // Integer fields reject floats; keep the two distinguishable.
        Value::Number(n) if n.is_i64() || n.is_u64() => "number",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required(path: &str) -> String {
    format!("{}: Required", path)
}

fn expected(path: &str, expected: &str, got: &Value) -> String {
    format!(
        "{}: Expected {}, received {}",
        path,
        expected,
        json_type_name(got)
    )
}

/// Validate an arbitrary JSON value as a story response.
///
/// Pure: no side effects, deterministic, and the input is never mutated.
/// Per-choice and game-state failures go through one repair pass; a repaired
/// response succeeds with an informational notice per reconstructed
/// fragment. The choices array cardinality is never repaired.
pub fn validate_story_response(raw: &Value) -> ValidationResult<StoryResponse> {
    let Some(root) = raw.as_object() else {
        return ValidationResult::failed(vec![expected("response", "object", raw)]);
    };

    let mut errors: Vec<String> = Vec::new();
    let mut notices: Vec<String> = Vec::new();

    // storyText
    let story_text = match root.get("storyText") {
        None => {
            errors.push(required("storyText"));
            None
        }
        Some(Value::String(s)) => {
            if s.is_empty() {
                errors.push("storyText: String must contain at least 1 character(s)".to_string());
                None
            } else if s.len() > STORY_TEXT_MAX_LEN {
                errors.push(format!(
                    "storyText: String must contain at most {} character(s)",
                    STORY_TEXT_MAX_LEN
                ));
                None
            } else {
                Some(s.clone())
            }
        }
        Some(other) => {
            errors.push(expected("storyText", "string", other));
            None
        }
    };

    // choices
    let choices = match root.get("choices") {
        None => {
            errors.push(required("choices"));
            None
        }
        Some(Value::Array(items)) => {
            if items.len() < CHOICES_MIN {
                errors.push(format!(
                    "choices: Array must contain at least {} element(s)",
                    CHOICES_MIN
                ));
                None
            } else if items.len() > CHOICES_MAX {
                errors.push(format!(
                    "choices: Array must contain at most {} element(s)",
                    CHOICES_MAX
                ));
                None
            } else {
                let mut parsed = Vec::with_capacity(items.len());
                let mut any_failed = false;
                for (index, item) in items.iter().enumerate() {
                    match validate_choice(item, index) {
                        Ok(choice) => parsed.push(choice),
                        Err(choice_errors) => match repair_choice(item, index) {
                            Some(repaired) => {
                                notices.push(format!(
                                    "choices[{}]: repaired malformed choice",
                                    index
                                ));
                                parsed.push(repaired);
                            }
                            None => {
                                any_failed = true;
                                errors.extend(choice_errors);
                            }
                        },
                    }
                }
                (!any_failed).then_some(parsed)
            }
        }
        Some(other) => {
            errors.push(expected("choices", "array", other));
            None
        }
    };

    // gameState
    let game_state = match root.get("gameState") {
        None => {
            errors.push(required("gameState"));
            None
        }
        Some(value) => match validate_game_state(value) {
            Ok(state) => Some(state),
            Err(state_errors) => match repair_game_state(value) {
                Some(repaired) => {
                    notices.push("gameState: repaired malformed game state".to_string());
                    Some(repaired)
                }
                None => {
                    errors.extend(state_errors);
                    None
                }
            },
        },
    };

    // isEnding
    let is_ending = match root.get("isEnding") {
        None => {
            errors.push(required("isEnding"));
            None
        }
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => {
            errors.push(expected("isEnding", "boolean", other));
            None
        }
    };

    // endingType (optional)
    let ending_type = match root.get("endingType") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(expected("endingType", "string", other));
            None
        }
    };

    if !errors.is_empty() {
        return ValidationResult::failed(errors);
    }

    // All four required fields parsed if we got here.
    let (Some(story_text), Some(choices), Some(game_state), Some(is_ending)) =
        (story_text, choices, game_state, is_ending)
    else {
        return ValidationResult::failed(vec!["response: Invalid type".to_string()]);
    };

    let response = StoryResponse {
        story_text,
        choices,
        game_state,
        is_ending,
        ending_type,
    };

    if notices.is_empty() {
        ValidationResult::ok(response)
    } else {
        ValidationResult::repaired(response, notices)
    }
}

/// Validate one entry of the choices array.
pub fn validate_choice(value: &Value, index: usize) -> Result<Choice, Vec<String>> {
    let path = format!("choices[{}]", index);
    let Some(map) = value.as_object() else {
        return Err(vec![expected(&path, "object", value)]);
    };

    let mut errors = Vec::new();

    let id = match map.get("id") {
        None => {
            errors.push(required(&format!("{}.id", path)));
            None
        }
        Some(Value::String(s)) => {
            if s.is_empty() || s.len() > CHOICE_ID_MAX_LEN {
                errors.push(format!(
                    "{}.id: String must contain 1 to {} character(s)",
                    path, CHOICE_ID_MAX_LEN
                ));
                None
            } else {
                Some(s.clone())
            }
        }
        Some(other) => {
            errors.push(expected(&format!("{}.id", path), "string", other));
            None
        }
    };

    let text = match map.get("text") {
        None => {
            errors.push(required(&format!("{}.text", path)));
            None
        }
        Some(Value::String(s)) => {
            if s.is_empty() || s.len() > CHOICE_TEXT_MAX_LEN {
                errors.push(format!(
                    "{}.text: String must contain 1 to {} character(s)",
                    path, CHOICE_TEXT_MAX_LEN
                ));
                None
            } else {
                Some(s.clone())
            }
        }
        Some(other) => {
            errors.push(expected(&format!("{}.text", path), "string", other));
            None
        }
    };

    let slug = match map.get("slug") {
        None => {
            errors.push(required(&format!("{}.slug", path)));
            None
        }
        Some(Value::String(s)) => {
            if s.is_empty() || s.len() > CHOICE_SLUG_MAX_LEN {
                errors.push(format!(
                    "{}.slug: String must contain 1 to {} character(s)",
                    path, CHOICE_SLUG_MAX_LEN
                ));
                None
            } else {
                Some(s.clone())
            }
        }
        Some(other) => {
            errors.push(expected(&format!("{}.slug", path), "string", other));
            None
        }
    };

    let mut consequences = Vec::new();
    match map.get("consequences") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => consequences.push(s.clone()),
                    other => errors.push(expected(
                        &format!("{}.consequences[{}]", path, i),
                        "string",
                        other,
                    )),
                }
            }
        }
        Some(other) => errors.push(expected(&format!("{}.consequences", path), "array", other)),
    }

    let mut trait_impacts = std::collections::BTreeMap::new();
    match map.get("traitImpacts") {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (axis, delta) in entries {
                match delta.as_i64() {
                    Some(delta) => {
                        trait_impacts.insert(axis.clone(), delta as i32);
                    }
                    None => errors.push(expected(
                        &format!("{}.traitImpacts.{}", path, axis),
                        "number",
                        delta,
                    )),
                }
            }
        }
        Some(other) => errors.push(expected(&format!("{}.traitImpacts", path), "object", other)),
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let (Some(id), Some(text), Some(slug)) = (id, text, slug) else {
        return Err(vec![format!("{}: Invalid type", path)]);
    };

    Ok(Choice {
        id,
        text,
        slug,
        consequences,
        trait_impacts,
    })
}

/// Validate the gameState fragment.
pub fn validate_game_state(value: &Value) -> Result<GameState, Vec<String>> {
    let Some(map) = value.as_object() else {
        return Err(vec![expected("gameState", "object", value)]);
    };

    let mut errors = Vec::new();

    let act = match map.get("act") {
        None => {
            errors.push(required("gameState.act"));
            None
        }
        Some(value) => match value.as_i64() {
            Some(act) if act >= 1 => Some(act as u32),
            Some(_) => {
                errors.push(
                    "gameState.act: Number must be greater than or equal to 1".to_string(),
                );
                None
            }
            None => {
                errors.push(expected("gameState.act", "number", value));
                None
            }
        },
    };

    let flags = match map.get("flags") {
        None => {
            errors.push(required("gameState.flags"));
            None
        }
        Some(Value::Array(items)) => {
            let mut flags = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => flags.push(s.clone()),
                    other => {
                        errors.push(expected(&format!("gameState.flags[{}]", i), "string", other))
                    }
                }
            }
            Some(flags)
        }
        Some(other) => {
            errors.push(expected("gameState.flags", "array", other));
            None
        }
    };

    let relationships = match map.get("relationships") {
        None => {
            errors.push(required("gameState.relationships"));
            None
        }
        Some(Value::Object(entries)) => {
            let mut relationships = std::collections::BTreeMap::new();
            for (name, score) in entries {
                match score.as_i64() {
                    Some(score) => {
                        relationships.insert(name.clone(), score as i32);
                    }
                    None => errors.push(expected(
                        &format!("gameState.relationships.{}", name),
                        "number",
                        score,
                    )),
                }
            }
            Some(relationships)
        }
        Some(other) => {
            errors.push(expected("gameState.relationships", "object", other));
            None
        }
    };

    let inventory = match map.get("inventory") {
        None => {
            errors.push(required("gameState.inventory"));
            None
        }
        Some(Value::Array(items)) => {
            let mut inventory = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => inventory.push(s.clone()),
                    other => errors.push(expected(
                        &format!("gameState.inventory[{}]", i),
                        "string",
                        other,
                    )),
                }
            }
            Some(inventory)
        }
        Some(other) => {
            errors.push(expected("gameState.inventory", "array", other));
            None
        }
    };

    let traits = match map.get("personalityTraits") {
        None => {
            errors.push(required("gameState.personalityTraits"));
            None
        }
        Some(value) => match validate_traits(value) {
            Ok(traits) => Some(traits),
            Err(trait_errors) => {
                errors.extend(trait_errors);
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let (Some(act), Some(flags), Some(relationships), Some(inventory), Some(traits)) =
        (act, flags, relationships, inventory, traits)
    else {
        return Err(vec!["gameState: Invalid type".to_string()]);
    };

    let mut state = GameState {
        act,
        flags: Vec::new(),
        relationships,
        inventory,
        personality_traits: traits,
    };
    for flag in flags {
        state.add_flag(flag);
    }
    Ok(state)
}

fn validate_traits(value: &Value) -> Result<PersonalityTraits, Vec<String>> {
    let Some(map) = value.as_object() else {
        return Err(vec![expected("gameState.personalityTraits", "object", value)]);
    };

    let mut errors = Vec::new();
    let mut axes = [0i64; 5];

    for (slot, axis) in PersonalityTraits::axis_names().iter().enumerate() {
        let path = format!("gameState.personalityTraits.{}", axis);
        match map.get(*axis) {
            None => errors.push(required(&path)),
            Some(value) => match value.as_i64() {
                Some(v) if v >= 0 && v <= i64::from(TRAIT_MAX) => axes[slot] = v,
                Some(v) if v < 0 => errors.push(format!(
                    "{}: Number must be greater than or equal to 0",
                    path
                )),
                Some(_) => errors.push(format!(
                    "{}: Number must be less than or equal to {}",
                    path, TRAIT_MAX
                )),
                None => errors.push(expected(&path, "number", value)),
            },
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(PersonalityTraits::from_clamped(
        axes[0], axes[1], axes[2], axes[3], axes[4],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({
            "storyText": "The lantern gutters as you descend.",
            "choices": [
                {"id": "A", "text": "Press on into the dark", "slug": "press_on"},
                {"id": "B", "text": "Climb back to the surface", "slug": "climb_back"}
            ],
            "gameState": {
                "act": 1,
                "flags": ["entered_the_mine"],
                "relationships": {"Mara": 10},
                "inventory": ["lantern"],
                "personalityTraits": {
                    "riskTaking": 55, "empathy": 50, "pragmatism": 45,
                    "creativity": 60, "leadership": 50
                }
            },
            "isEnding": false
        })
    }

    #[test]
    fn test_valid_payload_passes_unchanged() {
        let payload = valid_payload();
        let result = validate_story_response(&payload);
        assert!(result.success);
        assert!(result.errors.is_empty());
        assert!(!result.can_retry);

        let response = result.data.expect("data");
        assert_eq!(response.story_text, "The lantern gutters as you descend.");
        assert_eq!(response.choices.len(), 2);
        assert_eq!(response.choices[0].id, "A");
        assert_eq!(response.game_state.flags, vec!["entered_the_mine"]);
        assert_eq!(response.game_state.personality_traits.creativity, 60);
        assert!(!response.is_ending);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let payload = valid_payload();
        let first = validate_story_response(&payload);
        let second = validate_story_response(&payload);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_story_text_is_retryable() {
        let mut payload = valid_payload();
        payload
            .as_object_mut()
            .expect("object")
            .remove("storyText");
        let result = validate_story_response(&payload);
        assert!(!result.success);
        assert!(result.errors.contains(&"storyText: Required".to_string()));
        assert!(result.can_retry);
    }

    #[test]
    fn test_wrong_type_is_retryable() {
        let mut payload = valid_payload();
        payload["storyText"] = json!(42);
        let result = validate_story_response(&payload);
        assert!(!result.success);
        assert!(result
            .errors
            .contains(&"storyText: Expected string, received number".to_string()));
        assert!(result.can_retry);
    }

    #[test]
    fn test_oversized_story_text_is_not_retryable() {
        let mut payload = valid_payload();
        payload["storyText"] = json!("x".repeat(STORY_TEXT_MAX_LEN + 1));
        let result = validate_story_response(&payload);
        assert!(!result.success);
        assert!(!result.can_retry);
    }

    #[test]
    fn test_one_choice_fails_without_repair() {
        let mut payload = valid_payload();
        payload["choices"] = json!([{"id": "A", "text": "Only option", "slug": "only"}]);
        let result = validate_story_response(&payload);
        assert!(!result.success);
        assert!(result
            .errors
            .contains(&"choices: Array must contain at least 2 element(s)".to_string()));
        assert!(!result.can_retry);
    }

    #[test]
    fn test_five_choices_fail_without_repair() {
        let mut payload = valid_payload();
        let choice = json!({"id": "A", "text": "Option", "slug": "option"});
        payload["choices"] = Value::Array(vec![choice; 5]);
        let result = validate_story_response(&payload);
        assert!(!result.success);
        assert!(result
            .errors
            .contains(&"choices: Array must contain at most 4 element(s)".to_string()));
    }

    #[test]
    fn test_choice_missing_id_is_repaired_with_index_letter() {
        let mut payload = valid_payload();
        payload["choices"] = json!([
            {"text": "Press on into the dark", "slug": "press_on"},
            {"id": "B", "text": "Climb back to the surface", "slug": "climb_back"}
        ]);
        let result = validate_story_response(&payload);
        assert!(result.success);
        assert!(!result.can_retry);
        assert_eq!(
            result.errors,
            vec!["choices[0]: repaired malformed choice".to_string()]
        );
        let response = result.data.expect("data");
        assert_eq!(response.choices[0].id, "A");
    }

    #[test]
    fn test_empty_game_state_is_repaired_to_defaults() {
        let mut payload = valid_payload();
        payload["gameState"] = json!({});
        let result = validate_story_response(&payload);
        assert!(result.success);
        assert_eq!(
            result.errors,
            vec!["gameState: repaired malformed game state".to_string()]
        );
        let state = result.data.expect("data").game_state;
        assert_eq!(state.act, 1);
        assert!(state.flags.is_empty());
        assert!(state.inventory.is_empty());
        assert!(state.relationships.is_empty());
        assert_eq!(state.personality_traits, PersonalityTraits::neutral());
    }

    #[test]
    fn test_missing_game_state_is_required_not_repaired() {
        let mut payload = valid_payload();
        payload
            .as_object_mut()
            .expect("object")
            .remove("gameState");
        let result = validate_story_response(&payload);
        assert!(!result.success);
        assert!(result.errors.contains(&"gameState: Required".to_string()));
        assert!(result.can_retry);
    }

    #[test]
    fn test_trait_out_of_range_is_rejected_strictly() {
        let mut payload = valid_payload();
        payload["gameState"]["personalityTraits"]["empathy"] = json!(150);
        // The fragment fails strict validation but the repair path clamps it.
        let result = validate_story_response(&payload);
        assert!(result.success);
        assert_eq!(
            result.errors,
            vec!["gameState: repaired malformed game state".to_string()]
        );
        let state = result.data.expect("data").game_state;
        assert_eq!(state.personality_traits.empathy, 100);
    }

    #[test]
    fn test_non_object_response_fails() {
        let payload = json!("just a string");
        let result = validate_story_response(&payload);
        assert!(!result.success);
        assert!(result.can_retry);
    }

    #[test]
    fn test_ending_payload_keeps_ending_type() {
        let mut payload = valid_payload();
        payload["isEnding"] = json!(true);
        payload["endingType"] = json!("bittersweet");
        let result = validate_story_response(&payload);
        let response = result.data.expect("data");
        assert!(response.is_ending);
        assert_eq!(response.ending_type.as_deref(), Some("bittersweet"));
    }

    #[test]
    fn test_is_retryable_patterns() {
        assert!(is_retryable(&["storyText: Required".to_string()]));
        assert!(is_retryable(&[
            "choices: Expected array, received string".to_string()
        ]));
        assert!(is_retryable(&["response: Invalid type".to_string()]));
        assert!(!is_retryable(&[
            "choices: Array must contain at least 2 element(s)".to_string()
        ]));
        assert!(!is_retryable(&[]));
    }
}
