//! SQLite-backed storage.
//!
//! Structured fields are stored as JSON columns; lookup keys are promoted to
//! real columns so exact-match filters stay indexable.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use storyforge_domain::{
    RateLimitRecord, StoryRun, StoryRunId, StoryStep, StoryStepId, UserId, UserProfile,
};

use crate::infrastructure::ports::{
    ClockPort, QuotaCheck, RateLimitStore, RepoError, StoryRunRepo, StoryStepRepo, UserProfileRepo,
};

/// Open (creating if needed) the engine database and ensure its schema.
pub async fn connect(db_path: &str) -> Result<SqlitePool, RepoError> {
    let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await
        .map_err(|e| RepoError::database("connect", e))?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

async fn ensure_schema(pool: &SqlitePool) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS story_runs (
            id TEXT PRIMARY KEY,
            identity TEXT NOT NULL,
            completed INTEGER NOT NULL,
            run_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| RepoError::database("schema", e))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_story_runs_identity ON story_runs (identity)")
        .execute(pool)
        .await
        .map_err(|e| RepoError::database("schema", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS story_steps (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            step_index INTEGER NOT NULL,
            step_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| RepoError::database("schema", e))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_story_steps_run ON story_steps (run_id, step_index)")
        .execute(pool)
        .await
        .map_err(|e| RepoError::database("schema", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            id TEXT PRIMARY KEY,
            profile_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| RepoError::database("schema", e))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rate_limits (
            identity TEXT NOT NULL,
            date TEXT NOT NULL,
            request_count INTEGER NOT NULL,
            is_guest INTEGER NOT NULL,
            PRIMARY KEY (identity, date)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| RepoError::database("schema", e))?;

    Ok(())
}

// =============================================================================
// Story runs
// =============================================================================

pub struct SqliteStoryRunRepo {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteStoryRunRepo {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl StoryRunRepo for SqliteStoryRunRepo {
    async fn get(&self, id: StoryRunId) -> Result<Option<StoryRun>, RepoError> {
        let row = sqlx::query("SELECT run_json FROM story_runs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("story_runs", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("run_json");
                let run = serde_json::from_str(&json)
                    .map_err(|e| RepoError::Serialization(e.to_string()))?;
                Ok(Some(run))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, run: &StoryRun) -> Result<(), RepoError> {
        let json =
            serde_json::to_string(run).map_err(|e| RepoError::Serialization(e.to_string()))?;
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO story_runs (id, identity, completed, run_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                completed = excluded.completed,
                run_json = excluded.run_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(run.id.to_string())
        .bind(run.requester.key())
        .bind(run.completed)
        .bind(json)
        .bind(run.created_at.to_rfc3339())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("story_runs", e))?;

        Ok(())
    }

    async fn delete(&self, id: StoryRunId) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM story_runs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("story_runs", e))?;
        sqlx::query("DELETE FROM story_steps WHERE run_id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("story_steps", e))?;
        Ok(())
    }

    async fn list_for_identity(&self, identity: &str) -> Result<Vec<StoryRun>, RepoError> {
        let rows =
            sqlx::query("SELECT run_json FROM story_runs WHERE identity = ? ORDER BY created_at")
                .bind(identity)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepoError::database("story_runs", e))?;

        rows.into_iter()
            .map(|row| {
                let json: String = row.get("run_json");
                serde_json::from_str(&json).map_err(|e| RepoError::Serialization(e.to_string()))
            })
            .collect()
    }
}

// =============================================================================
// Story steps
// =============================================================================

pub struct SqliteStoryStepRepo {
    pool: SqlitePool,
}

impl SqliteStoryStepRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<StoryStep, RepoError> {
        let json: String = row.get("step_json");
        serde_json::from_str(&json).map_err(|e| RepoError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl StoryStepRepo for SqliteStoryStepRepo {
    async fn get(&self, id: StoryStepId) -> Result<Option<StoryStep>, RepoError> {
        let row = sqlx::query("SELECT step_json FROM story_steps WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("story_steps", e))?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn save(&self, step: &StoryStep) -> Result<(), RepoError> {
        let json =
            serde_json::to_string(step).map_err(|e| RepoError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO story_steps (id, run_id, step_index, step_json, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                step_json = excluded.step_json
            "#,
        )
        .bind(step.id.to_string())
        .bind(step.run_id.to_string())
        .bind(step.index)
        .bind(json)
        .bind(step.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("story_steps", e))?;

        Ok(())
    }

    async fn list_for_run(&self, run_id: StoryRunId) -> Result<Vec<StoryStep>, RepoError> {
        let rows = sqlx::query(
            "SELECT step_json FROM story_steps WHERE run_id = ? ORDER BY step_index",
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("story_steps", e))?;

        rows.iter().map(Self::decode).collect()
    }

    async fn latest_for_run(&self, run_id: StoryRunId) -> Result<Option<StoryStep>, RepoError> {
        let row = sqlx::query(
            "SELECT step_json FROM story_steps WHERE run_id = ? ORDER BY step_index DESC LIMIT 1",
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("story_steps", e))?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn set_chosen_choice(&self, id: StoryStepId, choice_id: &str) -> Result<(), RepoError> {
        let mut step = self.get(id).await?.ok_or(RepoError::NotFound)?;
        step.chosen_choice_id = Some(choice_id.to_string());
        self.save(&step).await
    }
}

// =============================================================================
// User profiles
// =============================================================================

pub struct SqliteUserProfileRepo {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteUserProfileRepo {
    pub fn new(pool: SqlitePool, clock: Arc<dyn ClockPort>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl UserProfileRepo for SqliteUserProfileRepo {
    async fn get(&self, id: &UserId) -> Result<Option<UserProfile>, RepoError> {
        let row = sqlx::query("SELECT profile_json FROM user_profiles WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("user_profiles", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("profile_json");
                let profile = serde_json::from_str(&json)
                    .map_err(|e| RepoError::Serialization(e.to_string()))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, profile: &UserProfile) -> Result<(), RepoError> {
        let json =
            serde_json::to_string(profile).map_err(|e| RepoError::Serialization(e.to_string()))?;
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO user_profiles (id, profile_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                profile_json = excluded.profile_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.id.as_str())
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("user_profiles", e))?;

        Ok(())
    }
}

// =============================================================================
// Rate limits
// =============================================================================

pub struct SqliteRateLimitStore {
    pool: SqlitePool,
}

impl SqliteRateLimitStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitStore for SqliteRateLimitStore {
    async fn try_increment(
        &self,
        identity: &str,
        date: NaiveDate,
        is_guest: bool,
        limit: u32,
    ) -> Result<QuotaCheck, RepoError> {
        if limit == 0 {
            return Ok(QuotaCheck {
                allowed: false,
                count: 0,
            });
        }

        // Single conditional upsert: the check and the bump happen in one
        // statement, so concurrent requests cannot both slip past the limit.
        let row = sqlx::query(
            r#"
            INSERT INTO rate_limits (identity, date, request_count, is_guest)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(identity, date) DO UPDATE SET
                request_count = rate_limits.request_count + 1
                WHERE rate_limits.request_count < ?
            RETURNING request_count
            "#,
        )
        .bind(identity)
        .bind(date.to_string())
        .bind(is_guest)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("rate_limits", e))?;

        match row {
            Some(row) => {
                let count: i64 = row.get("request_count");
                Ok(QuotaCheck {
                    allowed: true,
                    count: count as u32,
                })
            }
            None => {
                // Limit reached; report the standing count.
                let record = self.get(identity, date).await?;
                Ok(QuotaCheck {
                    allowed: false,
                    count: record.map(|r| r.request_count).unwrap_or(limit),
                })
            }
        }
    }

    async fn get(
        &self,
        identity: &str,
        date: NaiveDate,
    ) -> Result<Option<RateLimitRecord>, RepoError> {
        let row = sqlx::query(
            "SELECT request_count, is_guest FROM rate_limits WHERE identity = ? AND date = ?",
        )
        .bind(identity)
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("rate_limits", e))?;

        Ok(row.map(|row| {
            let count: i64 = row.get("request_count");
            let is_guest: bool = row.get("is_guest");
            RateLimitRecord {
                identity: identity.to_string(),
                date,
                request_count: count as u32,
                is_guest,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use chrono::Utc;
    use storyforge_domain::{ChallengeLevel, Genre, Requester, StoryLength};

    async fn test_pool() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine-test.db");
        let pool = connect(path.to_str().expect("utf8 path")).await.expect("connect");
        (pool, dir)
    }

    #[tokio::test]
    async fn test_run_save_and_get_roundtrip() {
        let (pool, _dir) = test_pool().await;
        let repo = SqliteStoryRunRepo::new(pool, Arc::new(SystemClock));
        let run = StoryRun::new(
            Requester::guest("s-1"),
            Genre::Fantasy,
            StoryLength::Quick,
            ChallengeLevel::Casual,
            Utc::now(),
        );

        repo.save(&run).await.expect("save");
        let loaded = repo.get(run.id).await.expect("get").expect("present");
        assert_eq!(loaded, run);

        let listed = repo
            .list_for_identity(&run.requester.key())
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_try_increment_enforces_limit() {
        let (pool, _dir) = test_pool().await;
        let store = SqliteRateLimitStore::new(pool);
        let date = Utc::now().date_naive();

        for expected in 1..=3u32 {
            let check = store
                .try_increment("guest:abc", date, true, 3)
                .await
                .expect("increment");
            assert!(check.allowed);
            assert_eq!(check.count, expected);
        }

        let denied = store
            .try_increment("guest:abc", date, true, 3)
            .await
            .expect("increment");
        assert!(!denied.allowed);
        assert_eq!(denied.count, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_buckets_are_per_day() {
        let (pool, _dir) = test_pool().await;
        let store = SqliteRateLimitStore::new(pool);
        let today = Utc::now().date_naive();
        let tomorrow = today.succ_opt().expect("valid date");

        for _ in 0..3 {
            store
                .try_increment("guest:abc", today, true, 3)
                .await
                .expect("increment");
        }
        let fresh = store
            .try_increment("guest:abc", tomorrow, true, 3)
            .await
            .expect("increment");
        assert!(fresh.allowed);
        assert_eq!(fresh.count, 1);
    }
}
