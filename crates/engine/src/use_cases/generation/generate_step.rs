//! Drives the producer -> validator -> repair -> retry pipeline for one step.

use std::sync::Arc;

use storyforge_domain::{Choice, StoryResponse, StoryRun};

use crate::infrastructure::ports::StoryProducerPort;
use crate::use_cases::generation::prompts;
use crate::use_cases::generation::retry::{validate_with_retry, RetryConfig};
use crate::use_cases::generation::validator::validate_story_response;
use crate::use_cases::generation::GenerationError;

/// An accepted step payload plus how it was obtained.
#[derive(Debug)]
pub struct GeneratedStep {
    pub response: StoryResponse,
    /// Repair notices, if the validator had to reconstruct fragments.
    pub notices: Vec<String>,
    /// Operation invocations it took to get an accepted payload.
    pub attempts: u32,
}

impl GeneratedStep {
    pub fn was_repaired(&self) -> bool {
        !self.notices.is_empty()
    }
}

/// Generates validated story steps through the configured producer.
pub struct StepGenerator {
    producer: Arc<dyn StoryProducerPort>,
    retry: RetryConfig,
}

impl StepGenerator {
    pub fn new(producer: Arc<dyn StoryProducerPort>, retry: RetryConfig) -> Self {
        Self { producer, retry }
    }

    /// Produce and validate the next step for a run.
    ///
    /// `previous` carries the prior step's text and the selected choice for
    /// continuations; `None` generates the opening step.
    pub async fn next_step(
        &self,
        run: &StoryRun,
        previous: Option<(&str, &Choice)>,
    ) -> Result<GeneratedStep, GenerationError> {
        let prompt = prompts::for_next_step(run, previous);

        let producer = Arc::clone(&self.producer);
        let outcome = validate_with_retry(
            || {
                let producer = Arc::clone(&producer);
                let prompt = prompt.clone();
                async move {
                    producer
                        .produce(&prompt)
                        .await
                        .map_err(anyhow::Error::from)
                }
            },
            validate_story_response,
            &self.retry,
        )
        .await;

        let attempts = outcome.attempts.len() as u32;
        match outcome.result.data {
            Some(response) => Ok(GeneratedStep {
                response,
                notices: outcome.result.errors,
                attempts,
            }),
            None => Err(GenerationError::ProducerExhausted {
                attempts,
                errors: outcome.result.errors,
                can_retry: outcome.result.can_retry,
            }),
        }
    }
}
