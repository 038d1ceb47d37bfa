//! Run statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one ingestion run. Created at start, mutated throughout the
/// single-threaded traversal, finalized and returned at the end.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionStats {
    /// Messages encountered, successful or not.
    pub total_messages: u64,
    /// Messages fully indexed and committed.
    pub successful: u64,
    /// Messages that failed anywhere in their pipeline.
    pub failed: u64,
    /// Attachments actually persisted (blob stored and row written).
    pub attachments_stored: u64,
    /// Distinct thread ids assigned during the run.
    pub threads_identified: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: Option<DateTime<Utc>>,
    /// Wall-clock duration in seconds.
    pub duration_seconds: Option<f64>,
    /// Fatal error, when the run aborted. Per-message failures are counted,
    /// not reported here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestionStats {
    /// Starts a fresh stats record stamped with the current time.
    #[must_use]
    pub fn start() -> Self {
        Self {
            total_messages: 0,
            successful: 0,
            failed: 0,
            attachments_stored: 0,
            threads_identified: 0,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            error: None,
        }
    }

    /// Stamps the end time, duration, and thread count.
    pub fn finalize(&mut self, threads_identified: usize) {
        let ended = Utc::now();
        self.threads_identified = u64::try_from(threads_identified).unwrap_or(u64::MAX);
        self.duration_seconds = (ended - self.started_at)
            .to_std()
            .ok()
            .map(|d| d.as_secs_f64());
        self.ended_at = Some(ended);
    }

    /// Whether the run aborted with a fatal error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_stamps_end_and_duration() {
        let mut stats = IngestionStats::start();
        stats.finalize(3);
        assert_eq!(stats.threads_identified, 3);
        assert!(stats.ended_at.is_some());
        assert!(stats.duration_seconds.is_some());
        assert!(!stats.is_error());
    }

    #[test]
    fn test_serializes_without_null_error() {
        let stats = IngestionStats::start();
        let json = serde_json::to_value(&stats).ok();
        let json = json.and_then(|v| v.as_object().cloned());
        assert!(json.is_some_and(|map| !map.contains_key("error")));
    }
}
