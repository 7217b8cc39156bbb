//! Prompt construction for story generation.

use storyforge_domain::{ChallengeLevel, Choice, StoryRun};

use crate::infrastructure::ports::StoryPrompt;

/// The JSON contract the model is asked to honor. Kept in one place so the
/// validator and the prompt can never drift apart silently.
const OUTPUT_CONTRACT: &str = r#"Respond with a single JSON object and nothing else:
{
  "storyText": "<narrative for this step, up to 5000 characters>",
  "choices": [
    {"id": "A", "text": "<player-facing choice>", "slug": "<stable_snake_case_key>",
     "consequences": ["<optional hint>"], "traitImpacts": {"riskTaking": 5}}
  ],
  "gameState": {
    "act": 1,
    "flags": ["<story flags seen so far plus any new ones>"],
    "relationships": {"<character name>": 0},
    "inventory": ["<item ids>"],
    "personalityTraits": {"riskTaking": 50, "empathy": 50, "pragmatism": 50, "creativity": 50, "leadership": 50}
  },
  "isEnding": false,
  "endingType": null
}
Offer 2 to 4 choices. Trait values stay between 0 and 100. When the story
concludes, set isEnding to true, set endingType, and still include choices
reflecting on the ending."#;

/// System prompt framing genre, pacing, and the output contract.
pub fn system_prompt(run: &StoryRun) -> String {
    let tone = match run.challenge {
        ChallengeLevel::Casual => "Let the player succeed more often than not; setbacks are recoverable.",
        ChallengeLevel::Challenging => "Choices have real costs; let poor decisions compound.",
    };
    format!(
        "You are the narrator of an interactive {} story. Aim for roughly {} \
         steps in total, pacing acts accordingly. {}\n\n{}",
        run.genre.display_name().to_lowercase(),
        run.length.target_steps(),
        tone,
        OUTPUT_CONTRACT,
    )
}

/// User prompt for the opening step of a run.
pub fn opening_prompt(run: &StoryRun) -> String {
    format!(
        "Begin a new {} story. Open in the middle of a scene, introduce the \
         protagonist in second person, and end at a decision point.",
        run.genre.display_name().to_lowercase()
    )
}

/// User prompt for a continuation step.
pub fn continuation_prompt(run: &StoryRun, previous_text: &str, chosen: &Choice) -> String {
    let state_json = serde_json::to_string(&run.game_state)
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "Previous step:\n{}\n\nThe player chose: \"{}\" ({}).\n\nCurrent game \
         state:\n{}\n\nContinue the story from that choice. This is step {} of \
         about {}.",
        previous_text,
        chosen.text,
        chosen.slug,
        state_json,
        run.step_count + 1,
        run.length.target_steps(),
    )
}

/// Convenience: assemble the full prompt for a run's next step.
pub fn for_next_step(run: &StoryRun, previous: Option<(&str, &Choice)>) -> StoryPrompt {
    let user = match previous {
        Some((text, chosen)) => continuation_prompt(run, text, chosen),
        None => opening_prompt(run),
    };
    StoryPrompt::new(system_prompt(run), user).with_temperature(0.8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storyforge_domain::{Genre, Requester, StoryLength};

    fn sample_run() -> StoryRun {
        StoryRun::new(
            Requester::guest("s-1"),
            Genre::Mystery,
            StoryLength::Standard,
            ChallengeLevel::Challenging,
            Utc::now(),
        )
    }

    #[test]
    fn test_system_prompt_mentions_genre_and_contract() {
        let prompt = system_prompt(&sample_run());
        assert!(prompt.contains("mystery"));
        assert!(prompt.contains("storyText"));
        assert!(prompt.contains("personalityTraits"));
    }

    #[test]
    fn test_continuation_prompt_carries_choice_and_state() {
        let run = sample_run();
        let chosen = Choice::new("A", "Follow the footprints", "follow_footprints");
        let prompt = continuation_prompt(&run, "Footprints cross the snow.", &chosen);
        assert!(prompt.contains("Follow the footprints"));
        assert!(prompt.contains("follow_footprints"));
        assert!(prompt.contains("personalityTraits"));
    }
}
