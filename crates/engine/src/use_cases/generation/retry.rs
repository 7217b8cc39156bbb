//! Retry orchestration for content generation.
//!
//! Wraps any async operation producing an untyped JSON value with bounded
//! validate-and-retry: the operation erroring and the operation returning
//! invalid data are the same kind of failure, distinguished only by the
//! error message. Progress is reported as a structured attempt history on
//! the outcome rather than through callbacks, so tests and callers see the
//! exact sequence deterministically.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::use_cases::generation::validator::ValidationResult;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of operation invocations allowed (1 = no retries).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// One attempt's worth of failure context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Errors from this attempt; empty on the successful attempt.
    pub errors: Vec<String>,
    /// True when the operation itself failed rather than its payload.
    pub operation_failed: bool,
}

/// Final result of a retried generation plus the full attempt history.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The last attempt's validation result. On failure it carries only that
    /// attempt's errors; earlier attempts live in `attempts`.
    pub result: ValidationResult<T>,
    pub attempts: Vec<AttemptRecord>,
}

impl<T> RetryOutcome<T> {
    /// Number of retries that were scheduled (attempts beyond the first).
    pub fn retries(&self) -> u32 {
        (self.attempts.len() as u32).saturating_sub(1)
    }
}

/// Drive `operation` through `validator` until success, a non-retryable
/// failure, or `config.max_attempts` invocations.
///
/// The delay between attempts is a non-blocking sleep; there is no timeout
/// on the operation itself and no cancellation - an abandoned caller simply
/// lets the loop run to completion.
pub async fn validate_with_retry<T, F, Fut, V>(
    operation: F,
    validator: V,
    config: &RetryConfig,
) -> RetryOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
    V: Fn(&Value) -> ValidationResult<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts: Vec<AttemptRecord> = Vec::new();

    for attempt in 1..=max_attempts {
        let (errors, retryable, operation_failed) = match operation().await {
            Ok(raw) => {
                let result = validator(&raw);
                if result.success {
                    if attempt > 1 {
                        tracing::info!(attempt, "Generation succeeded after retry");
                    }
                    attempts.push(AttemptRecord {
                        attempt,
                        errors: Vec::new(),
                        operation_failed: false,
                    });
                    return RetryOutcome { result, attempts };
                }
                (result.errors, result.can_retry, false)
            }
            // The operation erroring is treated like invalid data: a
            // retryable failure with a synthetic message.
            Err(e) => (vec![format!("Operation failed: {}", e)], true, true),
        };

        attempts.push(AttemptRecord {
            attempt,
            errors: errors.clone(),
            operation_failed,
        });

        if !retryable || attempt == max_attempts {
            tracing::error!(
                attempts = attempt,
                retryable,
                errors = ?errors,
                "Generation failed permanently"
            );
            return RetryOutcome {
                result: ValidationResult {
                    success: false,
                    data: None,
                    errors,
                    can_retry: retryable,
                },
                attempts,
            };
        }

        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = config.retry_delay.as_millis() as u64,
            errors = ?errors,
            "Generation attempt failed, retrying"
        );
        tokio::time::sleep(config.retry_delay).await;
    }

    // The loop always returns from within; this is unreachable but keeps the
    // signature total without panicking.
    RetryOutcome {
        result: ValidationResult {
            success: false,
            data: None,
            errors: vec!["Operation failed: no attempts executed".to_string()],
            can_retry: false,
        },
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::generation::validator::validate_story_response;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storyforge_domain::StoryResponse;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1),
        }
    }

    fn valid_payload() -> Value {
        json!({
            "storyText": "The bridge holds.",
            "choices": [
                {"id": "A", "text": "Cross", "slug": "cross"},
                {"id": "B", "text": "Wait", "slug": "wait"}
            ],
            "gameState": {
                "act": 1, "flags": [], "relationships": {}, "inventory": [],
                "personalityTraits": {
                    "riskTaking": 50, "empathy": 50, "pragmatism": 50,
                    "creativity": 50, "leadership": 50
                }
            },
            "isEnding": false
        })
    }

    /// Payload with a retryable defect (missing required field).
    fn retryable_payload() -> Value {
        let mut payload = valid_payload();
        payload.as_object_mut().expect("object").remove("storyText");
        payload
    }

    /// Payload with a non-retryable defect (too few choices).
    fn fatal_payload() -> Value {
        let mut payload = valid_payload();
        payload["choices"] = json!([{"id": "A", "text": "Only", "slug": "only"}]);
        payload
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let outcome: RetryOutcome<StoryResponse> = validate_with_retry(
            || async { Ok(valid_payload()) },
            validate_story_response,
            &fast_config(),
        )
        .await;

        assert!(outcome.result.success);
        assert_eq!(outcome.retries(), 0);
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_two_failures_then_success_records_two_retries() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<StoryResponse> = validate_with_retry(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Ok(retryable_payload())
                    } else {
                        Ok(valid_payload())
                    }
                }
            },
            validate_story_response,
            &fast_config(),
        )
        .await;

        assert!(outcome.result.success);
        assert_eq!(outcome.retries(), 2);
        assert_eq!(outcome.attempts.len(), 3);
        assert!(!outcome.attempts[0].errors.is_empty());
        assert!(!outcome.attempts[1].errors.is_empty());
        assert!(outcome.attempts[2].errors.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_stops_after_first_attempt() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<StoryResponse> = validate_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(fatal_payload()) }
            },
            validate_story_response,
            &RetryConfig {
                max_attempts: 5,
                retry_delay: Duration::from_millis(1),
            },
        )
        .await;

        assert!(!outcome.result.success);
        assert!(!outcome.result.can_retry);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_attempt_errors_only() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<StoryResponse> = validate_with_retry(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    // Different retryable defect each attempt.
                    if call == 2 {
                        Err(anyhow::anyhow!("connection reset"))
                    } else {
                        Ok(retryable_payload())
                    }
                }
            },
            validate_story_response,
            &fast_config(),
        )
        .await;

        assert!(!outcome.result.success);
        // Exhausted on retryable errors: the caller may try again later.
        assert!(outcome.result.can_retry);
        assert_eq!(outcome.attempts.len(), 3);
        // Only the final attempt's error list surfaces on the result.
        assert_eq!(
            outcome.result.errors,
            vec!["Operation failed: connection reset".to_string()]
        );
    }

    #[tokio::test]
    async fn test_operation_error_is_retryable() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<StoryResponse> = validate_with_retry(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(anyhow::anyhow!("model crashed"))
                    } else {
                        Ok(valid_payload())
                    }
                }
            },
            validate_story_response,
            &fast_config(),
        )
        .await;

        assert!(outcome.result.success);
        assert_eq!(outcome.retries(), 1);
        assert!(outcome.attempts[0].operation_failed);
        assert_eq!(
            outcome.attempts[0].errors,
            vec!["Operation failed: model crashed".to_string()]
        );
    }
}
