//! Story run user stories.

pub mod continue_run;
pub mod get_run;
pub mod quota_status;
pub mod start_run;

pub use continue_run::{ContinueRun, ContinueRunOutput};
pub use get_run::GetRun;
pub use quota_status::{QuotaStatus, QuotaStatusOutput};
pub use start_run::{StartRun, StartRunOutput};

use std::sync::Arc;

use crate::infrastructure::ports::{ClockPort, StoryRunRepo, StoryStepRepo};
use crate::use_cases::gate::{FeatureGate, RateLimiter};
use crate::use_cases::generation::StepGenerator;

/// Container for the story use cases.
pub struct StoryUseCases {
    pub start_run: StartRun,
    pub continue_run: ContinueRun,
    pub get_run: GetRun,
    pub quota_status: QuotaStatus,
}

impl StoryUseCases {
    pub fn new(
        runs: Arc<dyn StoryRunRepo>,
        steps: Arc<dyn StoryStepRepo>,
        gate: Arc<FeatureGate>,
        limiter: Arc<RateLimiter>,
        generator: Arc<StepGenerator>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            start_run: StartRun::new(
                runs.clone(),
                steps.clone(),
                gate.clone(),
                limiter.clone(),
                generator.clone(),
                clock.clone(),
            ),
            continue_run: ContinueRun::new(
                runs.clone(),
                steps.clone(),
                gate.clone(),
                limiter.clone(),
                generator,
                clock,
            ),
            get_run: GetRun::new(runs, steps),
            quota_status: QuotaStatus::new(gate, limiter),
        }
    }
}
