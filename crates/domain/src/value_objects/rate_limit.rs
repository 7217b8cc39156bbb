//! Rate-limit record value object.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One identity's request counter for one UTC calendar day.
///
/// Created lazily on the first request of the day; there is at most one
/// record per (identity, date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    /// Rate bucket key (`Requester::key()`).
    pub identity: String,
    /// UTC calendar day the counter applies to.
    pub date: NaiveDate,
    pub request_count: u32,
    pub is_guest: bool,
}

impl RateLimitRecord {
    pub fn first_of_day(identity: impl Into<String>, date: NaiveDate, is_guest: bool) -> Self {
        Self {
            identity: identity.into(),
            date,
            request_count: 1,
            is_guest,
        }
    }
}
