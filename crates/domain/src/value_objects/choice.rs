//! Choice value object - one selectable branch offered at a story step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Maximum length of a choice id token (conventionally "A".."D").
pub const CHOICE_ID_MAX_LEN: usize = 8;
/// Maximum length of the player-facing choice text.
pub const CHOICE_TEXT_MAX_LEN: usize = 500;
/// Maximum length of the machine-readable slug.
pub const CHOICE_SLUG_MAX_LEN: usize = 100;

/// A selectable branch in a story step.
///
/// `id` is the short stable token shown to the player ("A".."D"); `slug` is
/// the stable machine-readable key used for choice statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: String,
    pub text: String,
    pub slug: String,
    /// Narrative consequences hinted at by the model. May be empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consequences: Vec<String>,
    /// Trait axis -> signed delta applied when this choice is selected.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trait_impacts: BTreeMap<String, i32>,
}

impl Choice {
    pub fn new(id: impl Into<String>, text: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            slug: slug.into(),
            consequences: Vec::new(),
            trait_impacts: BTreeMap::new(),
        }
    }

    /// The conventional id token for a choice at the given position (0 -> "A").
    pub fn letter_for_index(index: usize) -> String {
        let letter = (b'A' + (index % 26) as u8) as char;
        letter.to_string()
    }

    /// Check the structural invariants on an already-constructed choice.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.is_empty() || self.id.len() > CHOICE_ID_MAX_LEN {
            return Err(DomainError::validation(format!(
                "choice id must be 1-{} characters",
                CHOICE_ID_MAX_LEN
            )));
        }
        if self.text.is_empty() || self.text.len() > CHOICE_TEXT_MAX_LEN {
            return Err(DomainError::validation(format!(
                "choice text must be 1-{} characters",
                CHOICE_TEXT_MAX_LEN
            )));
        }
        if self.slug.is_empty() || self.slug.len() > CHOICE_SLUG_MAX_LEN {
            return Err(DomainError::validation(format!(
                "choice slug must be 1-{} characters",
                CHOICE_SLUG_MAX_LEN
            )));
        }
        Ok(())
    }
}
