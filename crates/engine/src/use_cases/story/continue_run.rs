//! Continue a story run by selecting a choice.

use std::sync::Arc;

use storyforge_domain::{Requester, StoryRun, StoryRunId, StoryStep};

use crate::infrastructure::ports::{ClockPort, StoryRunRepo, StoryStepRepo};
use crate::use_cases::gate::{FeatureGate, RateLimiter};
use crate::use_cases::generation::{GenerationError, StepGenerator};

/// The next step of a run plus generation metadata.
#[derive(Debug)]
pub struct ContinueRunOutput {
    pub run: StoryRun,
    pub step: StoryStep,
    pub notices: Vec<String>,
    pub remaining_requests: u32,
}

pub struct ContinueRun {
    runs: Arc<dyn StoryRunRepo>,
    steps: Arc<dyn StoryStepRepo>,
    gate: Arc<FeatureGate>,
    limiter: Arc<RateLimiter>,
    generator: Arc<StepGenerator>,
    clock: Arc<dyn ClockPort>,
}

impl ContinueRun {
    pub fn new(
        runs: Arc<dyn StoryRunRepo>,
        steps: Arc<dyn StoryStepRepo>,
        gate: Arc<FeatureGate>,
        limiter: Arc<RateLimiter>,
        generator: Arc<StepGenerator>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            runs,
            steps,
            gate,
            limiter,
            generator,
            clock,
        }
    }

    pub async fn execute(
        &self,
        run_id: StoryRunId,
        requester: &Requester,
        choice_id: &str,
    ) -> Result<ContinueRunOutput, GenerationError> {
        let mut run = self
            .runs
            .get(run_id)
            .await?
            .ok_or(GenerationError::RunNotFound)?;

        // Runs are private to their requester; report foreign ids as absent.
        if run.requester != *requester {
            return Err(GenerationError::RunNotFound);
        }
        if run.completed {
            return Err(GenerationError::RunCompleted);
        }

        let latest = self
            .steps
            .latest_for_run(run_id)
            .await?
            .ok_or(GenerationError::RunNotFound)?;
        let chosen = latest
            .choice(choice_id)
            .ok_or_else(|| GenerationError::UnknownChoice(choice_id.to_string()))?
            .clone();

        // Genre and length were gated at run start; each continuation only
        // consumes quota.
        let tier = self.gate.resolve_tier(requester).await;
        let decision = self.limiter.enforce(requester, tier).await;
        if !decision.allowed {
            return Err(GenerationError::QuotaExceeded { decision });
        }

        // The selected choice shapes the state the model continues from.
        run.apply_choice_impacts(&chosen.trait_impacts);

        let generated = self
            .generator
            .next_step(&run, Some((latest.story_text.as_str(), &chosen)))
            .await?;

        let next_index = run.step_count;
        let now = self.clock.now();
        run.apply_response(&generated.response, now)?;

        let step = StoryStep::from_response(
            run.id,
            next_index,
            &generated.response,
            generated.was_repaired(),
            now,
        );

        self.steps.set_chosen_choice(latest.id, choice_id).await?;
        self.runs.save(&run).await?;
        self.steps.save(&step).await?;

        tracing::info!(
            run_id = %run.id,
            step_index = next_index,
            choice = choice_id,
            attempts = generated.attempts,
            is_ending = step.is_ending,
            "Continued story run"
        );

        Ok(ContinueRunOutput {
            run,
            step,
            notices: generated.notices,
            remaining_requests: decision.remaining_requests,
        })
    }
}
