//! A buddybuild build record and the timing metrics derived from it.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer};

/// Size of one tick for queue and build durations.
pub const TICK_SECONDS: i64 = 15;

/// Commit metadata attached to a build, taken verbatim from upstream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommitInfo {
    pub author: String,
    pub branch: String,
    pub commit_sha: String,
    #[serde(rename = "html_url")]
    pub url: String,
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

/// One CI run as returned by `GET /v1/apps/{app_id}/builds`.
///
/// Unset timestamps decode to the zero value. Nothing here checks that
/// `created_at <= started_at <= finished_at`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Build {
    pub build_number: i64,
    pub build_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub commit_info: CommitInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: DateTime<Utc>,
    pub finished: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub finished_at: DateTime<Utc>,
    #[serde(deserialize_with = "null_as_default")]
    pub started_at: DateTime<Utc>,
}

impl Build {
    /// Ticks spent waiting between creation and start.
    pub fn queue_duration(&self) -> i64 {
        ticks_between(self.created_at, self.started_at)
    }

    /// Ticks spent building between start and finish.
    pub fn build_duration(&self) -> i64 {
        ticks_between(self.started_at, self.finished_at)
    }

    /// Raw elapsed time between creation and finish. Negative for malformed records.
    pub fn total_duration(&self) -> TimeDelta {
        self.finished_at - self.created_at
    }
}

/// `(whole_seconds + 15) / 15`, truncating in both steps.
fn ticks_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    ((to - from).num_seconds() + TICK_SECONDS) / TICK_SECONDS
}

/// Treat an explicit JSON `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
