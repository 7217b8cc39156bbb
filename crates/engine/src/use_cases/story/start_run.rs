//! Start a new story run and generate its opening step.

use std::sync::Arc;

use storyforge_domain::{GenerationRequest, StoryRun, StoryStep};

use crate::infrastructure::ports::{ClockPort, StoryRunRepo, StoryStepRepo};
use crate::use_cases::gate::{FeatureGate, RateLimiter};
use crate::use_cases::generation::{GenerationError, StepGenerator};

/// A freshly started run plus everything the caller needs to render it.
#[derive(Debug)]
pub struct StartRunOutput {
    pub run: StoryRun,
    pub step: StoryStep,
    /// Repair notices from the validator, if any.
    pub notices: Vec<String>,
    pub remaining_requests: u32,
}

pub struct StartRun {
    runs: Arc<dyn StoryRunRepo>,
    steps: Arc<dyn StoryStepRepo>,
    gate: Arc<FeatureGate>,
    limiter: Arc<RateLimiter>,
    generator: Arc<StepGenerator>,
    clock: Arc<dyn ClockPort>,
}

impl StartRun {
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
        request: GenerationRequest,
    ) -> Result<StartRunOutput, GenerationError> {
        // Feature gate first: a denial here is fatal and consumes no quota.
        let access = self
            .gate
            .validate_story_request(&request.requester, request.genre, request.length)
            .await;
        if let Some(reason) = access.reason {
            return Err(GenerationError::FeatureDenied { reason });
        }

        let tier = self.gate.resolve_tier(&request.requester).await;
        let decision = self.limiter.enforce(&request.requester, tier).await;
        if !decision.allowed {
            return Err(GenerationError::QuotaExceeded { decision });
        }

        let mut run = StoryRun::new(
            request.requester,
            request.genre,
            request.length,
            request.challenge,
            self.clock.now(),
        );

        let generated = self.generator.next_step(&run, None).await?;
        let now = self.clock.now();
        run.apply_response(&generated.response, now)?;

        let step = StoryStep::from_response(
            run.id,
            0,
            &generated.response,
            generated.was_repaired(),
            now,
        );

        self.runs.save(&run).await?;
        self.steps.save(&step).await?;

        tracing::info!(
            run_id = %run.id,
            genre = %run.genre,
            attempts = generated.attempts,
            repaired = generated.was_repaired(),
            "Started story run"
        );

        Ok(StartRunOutput {
            run,
            step,
            notices: generated.notices,
            remaining_requests: decision.remaining_requests,
        })
    }
}
