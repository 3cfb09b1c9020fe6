//! Reconciler and driver settings.
//!
//! Durations are written as whole milliseconds when serialized.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for a single reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcilerConfig {
    /// Upper bound on one permalink resolution.
    #[serde(with = "millis")]
    pub permalink_timeout: Duration,
    /// Whole-pass re-runs after a version conflict before giving up.
    pub max_conflict_retries: u32,
    /// Delay before a pass that ran out of conflict retries is tried again.
    #[serde(with = "millis")]
    pub conflict_requeue_after: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            permalink_timeout: Duration::from_secs(60),
            max_conflict_retries: 5,
            conflict_requeue_after: Duration::from_secs(1),
        }
    }
}

/// Settings for the [`Controller`](crate::Controller) work queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Maximum reconciles running at once.
    pub workers: usize,
    /// Enqueue every known resource this often. `None` disables resync.
    #[serde(with = "millis_opt", skip_serializing_if = "Option::is_none")]
    pub resync_interval: Option<Duration>,
    /// Delay before a failed reconcile is retried.
    #[serde(with = "millis")]
    pub error_backoff: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            resync_interval: None,
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Serde adapter for a [`Duration`] stored as milliseconds.
pub mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Serde adapter for an optional [`Duration`] stored as milliseconds.
pub mod millis_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
    }
}
