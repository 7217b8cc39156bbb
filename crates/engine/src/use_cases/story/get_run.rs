//! Fetch a run and its step history.

use std::sync::Arc;

use storyforge_domain::{Requester, StoryRun, StoryRunId, StoryStep};

use crate::infrastructure::ports::{StoryRunRepo, StoryStepRepo};
use crate::use_cases::generation::GenerationError;

pub struct GetRun {
    runs: Arc<dyn StoryRunRepo>,
    steps: Arc<dyn StoryStepRepo>,
}

impl GetRun {
    pub fn new(runs: Arc<dyn StoryRunRepo>, steps: Arc<dyn StoryStepRepo>) -> Self {
        Self { runs, steps }
    }

    pub async fn execute(
        &self,
        run_id: StoryRunId,
        requester: &Requester,
    ) -> Result<StoryRun, GenerationError> {
        let run = self
            .runs
            .get(run_id)
            .await?
            .ok_or(GenerationError::RunNotFound)?;
        if run.requester != *requester {
            return Err(GenerationError::RunNotFound);
        }
        Ok(run)
    }

    pub async fn steps(
        &self,
        run_id: StoryRunId,
        requester: &Requester,
    ) -> Result<Vec<StoryStep>, GenerationError> {
        // Ownership check rides on the run lookup.
        self.execute(run_id, requester).await?;
        Ok(self.steps.list_for_run(run_id).await?)
    }
}
