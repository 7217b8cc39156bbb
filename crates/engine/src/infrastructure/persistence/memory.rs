//! In-memory storage.
//!
//! Used for single-node deployments without a database and throughout the
//! test suite. The rate-limit store keeps its check-and-bump atomic by
//! mutating through the dashmap entry API, which holds the shard lock for
//! the duration of the closure.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

use storyforge_domain::{
    RateLimitRecord, StoryRun, StoryRunId, StoryStep, StoryStepId, UserId, UserProfile,
};

use crate::infrastructure::ports::{
    QuotaCheck, RateLimitStore, RepoError, StoryRunRepo, StoryStepRepo, UserProfileRepo,
};

// =============================================================================
// Rate limits
// =============================================================================

#[derive(Default)]
pub struct InMemoryRateLimitStore {
    records: DashMap<(String, NaiveDate), RateLimitRecord>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn try_increment(
        &self,
        identity: &str,
        date: NaiveDate,
        is_guest: bool,
        limit: u32,
    ) -> Result<QuotaCheck, RepoError> {
        let mut entry = self
            .records
            .entry((identity.to_string(), date))
            .or_insert_with(|| RateLimitRecord {
                identity: identity.to_string(),
                date,
                request_count: 0,
                is_guest,
            });

        if entry.request_count < limit {
            entry.request_count += 1;
            Ok(QuotaCheck {
                allowed: true,
                count: entry.request_count,
            })
        } else {
            Ok(QuotaCheck {
                allowed: false,
                count: entry.request_count,
            })
        }
    }

    async fn get(
        &self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<Option<RateLimitRecord>, RepoError> {
        Ok(self
            .records
            .get(&(identity.to_string(), date))
            .map(|entry| entry.value().clone()))
    }
}

// =============================================================================
// Story runs / steps / profiles
// =============================================================================

#[derive(Default)]
pub struct InMemoryStoryRunRepo {
    runs: DashMap<StoryRunId, StoryRun>,
}

impl InMemoryStoryRunRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoryRunRepo for InMemoryStoryRunRepo {
    async fn get(&self, id: StoryRunId) -> Result<Option<StoryRun>, RepoError> {
        Ok(self.runs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, run: &StoryRun) -> Result<(), RepoError> {
        self.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn delete(&self, id: StoryRunId) -> Result<(), RepoError> {
        self.runs.remove(&id);
        Ok(())
    }

    async fn list_for_identity(&self, identity: &str) -> Result<Vec<StoryRun>, RepoError> {
        let mut runs: Vec<StoryRun> = self
            .runs
            .iter()
            .filter(|entry| entry.requester.key() == identity)
            .map(|entry| entry.value().clone())
            .collect();
        runs.sort_by_key(|run| run.created_at);
        Ok(runs)
    }
}

#[derive(Default)]
pub struct InMemoryStoryStepRepo {
    steps: DashMap<StoryStepId, StoryStep>,
}

impl InMemoryStoryStepRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoryStepRepo for InMemoryStoryStepRepo {
    async fn get(&self, id: StoryStepId) -> Result<Option<StoryStep>, RepoError> {
        Ok(self.steps.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, step: &StoryStep) -> Result<(), RepoError> {
        self.steps.insert(step.id, step.clone());
        Ok(())
    }

    async fn list_for_run(&self, run_id: StoryRunId) -> Result<Vec<StoryStep>, RepoError> {
        let mut steps: Vec<StoryStep> = self
            .steps
            .iter()
            .filter(|entry| entry.run_id == run_id)
            .map(|entry| entry.value().clone())
            .collect();
        steps.sort_by_key(|step| step.index);
        Ok(steps)
    }

    async fn latest_for_run(&self, run_id: StoryRunId) -> Result<Option<StoryStep>, RepoError> {
        Ok(self
            .list_for_run(run_id)
            .await?
            .into_iter()
            .max_by_key(|step| step.index))
    }

    async fn set_chosen_choice(&self, id: StoryStepId, choice_id: &str) -> Result<(), RepoError> {
        match self.steps.get_mut(&id) {
            Some(mut entry) => {
                entry.chosen_choice_id = Some(choice_id.to_string());
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct InMemoryUserProfileRepo {
    profiles: DashMap<UserId, UserProfile>,
}

impl InMemoryUserProfileRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserProfileRepo for InMemoryUserProfileRepo {
    async fn get(&self, id: &UserId) -> Result<Option<UserProfile>, RepoError> {
        Ok(self.profiles.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, profile: &UserProfile) -> Result<(), RepoError> {
        self.profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}
