//! Payloads reported to the panel.
//!
//! The integration only relies on [`WardenIteration`] and
//! [`WardenCheckResult`]; monitoring engines can post their own types by
//! implementing them. The record types below are ready-made implementations
//! that decode leniently (missing fields take their default value).

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One full round of checks performed by a warden.
pub trait WardenIteration: Serialize {
    fn warden_name(&self) -> &str;
}

/// The result of a single watcher check.
pub trait WardenCheckResult: Serialize {
    /// Name of the watcher that produced the nested watcher result.
    fn watcher_name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Iteration {
    pub warden_name: String,
    pub ordinal: u64,
    pub is_valid: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub results: Vec<CheckResult>,
}

impl Iteration {
    pub fn new(warden_name: impl Into<String>, ordinal: u64) -> Self {
        Self {
            warden_name: warden_name.into(),
            ordinal,
            ..Default::default()
        }
    }

    /// Appends `result` and recomputes validity, start, completion and
    /// execution time from the collected results.
    pub fn with_result(mut self, result: CheckResult) -> Self {
        self.results.push(result);
        self.is_valid = self.results.iter().all(|r| r.is_valid);
        self.started_at = self.results.iter().filter_map(|r| r.started_at).min();
        self.completed_at = self.results.iter().filter_map(|r| r.completed_at).max();
        self.execution_time = match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        };
        self
    }
}

impl WardenIteration for Iteration {
    fn warden_name(&self) -> &str {
        &self.warden_name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckResult {
    pub is_valid: bool,
    pub watcher_check_result: WatcherCheckResult,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "duration_ms")]
    pub execution_time: Duration,
    pub exception: Option<ExceptionInfo>,
}

impl CheckResult {
    pub fn valid(
        watcher_check_result: WatcherCheckResult,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self::build(watcher_check_result, started_at, completed_at, None)
    }

    pub fn invalid(
        watcher_check_result: WatcherCheckResult,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        exception: Option<ExceptionInfo>,
    ) -> Self {
        let mut result = Self::build(watcher_check_result, started_at, completed_at, exception);
        result.is_valid = false;
        result
    }

    fn build(
        watcher_check_result: WatcherCheckResult,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        exception: Option<ExceptionInfo>,
    ) -> Self {
        Self {
            is_valid: watcher_check_result.is_valid && exception.is_none(),
            watcher_check_result,
            started_at: Some(started_at),
            completed_at: Some(completed_at),
            execution_time: (completed_at - started_at).to_std().unwrap_or_default(),
            exception,
        }
    }
}

impl WardenCheckResult for CheckResult {
    fn watcher_name(&self) -> &str {
        &self.watcher_check_result.watcher_name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatcherCheckResult {
    pub watcher_name: String,
    pub watcher_type: String,
    pub description: String,
    pub is_valid: bool,
}

impl WatcherCheckResult {
    pub fn new(
        watcher_name: impl Into<String>,
        watcher_type: impl Into<String>,
        description: impl Into<String>,
        is_valid: bool,
    ) -> Self {
        Self {
            watcher_name: watcher_name.into(),
            watcher_type: watcher_type.into(),
            description: description.into(),
            is_valid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExceptionInfo {
    pub message: String,
    pub source: Option<String>,
    pub stack_trace: Option<String>,
    pub inner_exception: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Flattens an error and its `source()` chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            message: error.to_string(),
            source: None,
            stack_trace: None,
            inner_exception: error.source().map(|inner| Box::new(Self::from_error(inner))),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, secs).unwrap()
    }

    #[test]
    fn iteration_aggregates_results() {
        let ok = CheckResult::valid(WatcherCheckResult::new("Api", "WebWatcher", "ok", true), at(0), at(2));
        let bad = CheckResult::invalid(
            WatcherCheckResult::new("Db", "SqlWatcher", "down", false),
            at(1),
            at(5),
            Some(ExceptionInfo::new("connection refused")),
        );
        let iteration = Iteration::new("Warden", 3).with_result(ok).with_result(bad);

        assert!(!iteration.is_valid);
        assert_eq!(iteration.started_at, Some(at(0)));
        assert_eq!(iteration.completed_at, Some(at(5)));
        assert_eq!(iteration.execution_time, Duration::from_secs(5));
        assert_eq!(iteration.warden_name(), "Warden");
    }

    #[test]
    fn check_result_exposes_nested_watcher_name() {
        let result = CheckResult::valid(WatcherCheckResult::new("Website", "WebWatcher", "", true), at(0), at(1));
        assert_eq!(result.watcher_name(), "Website");
        assert!(result.is_valid);
        assert_eq!(result.execution_time, Duration::from_secs(1));
    }

    #[test]
    fn missing_fields_decode_to_defaults() {
        let result: CheckResult =
            serde_json::from_str(r#"{"watcherCheckResult": {"watcherName": "Api"}, "executionTime": 250}"#)
                .unwrap();
        assert_eq!(result.watcher_name(), "Api");
        assert!(!result.is_valid);
        assert_eq!(result.execution_time, Duration::from_millis(250));
        assert!(result.exception.is_none());
    }

    #[test]
    fn exception_info_follows_source_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);

        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("check failed")
            }
        }

        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"));
        let info = ExceptionInfo::from_error(&err);
        assert_eq!(info.message, "check failed");
        assert_eq!(info.inner_exception.unwrap().message, "timed out");
    }
}
