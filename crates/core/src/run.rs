// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark run types.
//!
//! These types mirror the persisted benchmark document field for field:
//!
//! ```text
//! { lastUpdate, repoUrl, entries: { <tool>: [ { commit, date, tool, benches: [ Sample ] } ] } }
//! ```
//!
//! Fields this crate does not know about are kept in an `other` map on each
//! type and written back unchanged, so newer producers can add fields without
//! older readers dropping them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::series::SeriesKey;

/// Author or committer of a commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitIdentity {
    /// E-mail address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Forge username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Unrecognized fields, preserved verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The commit a run was benchmarked against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<CommitIdentity>,
    /// Commit committer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<CommitIdentity>,
    /// Whether the commit was distinct in its push
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    /// Commit id (SHA)
    #[serde(default)]
    pub id: String,
    /// Commit message
    #[serde(default)]
    pub message: String,
    /// Commit timestamp as reported by the forge (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Tree id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    /// Link to the commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Unrecognized fields, preserved verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Commit {
    /// Create a commit with only an id and message.
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Abbreviated commit id, as shown in alerts and reports.
    pub fn short_id(&self) -> &str {
        short_commit_id(&self.id)
    }
}

/// First seven characters of a commit id.
pub fn short_commit_id(id: &str) -> &str {
    let end = id.char_indices().nth(7).map(|(i, _)| i).unwrap_or(id.len());
    &id[..end]
}

/// One metric observation within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Metric name, e.g. `dropped_logs_total`
    pub name: String,
    /// Measured value. May be negative (counter resets).
    #[serde(with = "number")]
    pub value: f64,
    /// Spread reported by the harness, e.g. `"± 3.2"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Free-text unit. Not guaranteed stable across a series.
    #[serde(default)]
    pub unit: String,
    /// Scenario label; discriminates series sharing a metric name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Unrecognized fields, preserved verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Sample {
    /// Create a sample without a scenario label.
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            range: None,
            unit: unit.into(),
            extra: None,
            other: Map::new(),
        }
    }

    /// Set the scenario label.
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Set the reported range.
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// The series this sample belongs to under `tool`.
    pub fn series_key(&self, tool: &str) -> SeriesKey {
        SeriesKey::new(tool, self.name.clone(), self.extra.clone())
    }
}

/// One CI benchmark execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Benchmarked commit
    pub commit: Commit,
    /// Publish timestamp in epoch milliseconds
    pub date: i64,
    /// Benchmark suite name
    pub tool: String,
    /// Samples, in harness order
    pub benches: Vec<Sample>,
    /// Unrecognized fields, preserved verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Run {
    /// Create a new run.
    pub fn new(tool: impl Into<String>, commit: Commit, date: i64, benches: Vec<Sample>) -> Self {
        Self {
            commit,
            date,
            tool: tool.into(),
            benches,
            other: Map::new(),
        }
    }

    /// Publish time as a UTC timestamp, if `date` is in range.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.date)
    }

    /// Find the sample for a metric name and scenario label.
    pub fn sample(&self, name: &str, extra: Option<&str>) -> Option<&Sample> {
        self.benches
            .iter()
            .find(|s| s.name == name && s.extra.as_deref() == extra)
    }

    /// Whether this run has the given `(commit id, date)` identity.
    pub fn is_same_publish(&self, commit_id: &str, date: i64) -> bool {
        self.commit.id == commit_id && self.date == date
    }
}

/// The persisted benchmark document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkData {
    /// Time of the most recent append, epoch milliseconds
    #[serde(rename = "lastUpdate", default)]
    pub last_update: i64,
    /// Repository the runs belong to
    #[serde(rename = "repoUrl", default)]
    pub repo_url: String,
    /// Runs per tool, in append order. Tools keep their document order.
    #[serde(default)]
    pub entries: IndexMap<String, Vec<Run>>,
    /// Unrecognized fields, preserved verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl BenchmarkData {
    /// Create an empty document for a repository.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Self::default()
        }
    }
}

/// Serializes integral values without a fractional part so that documents
/// written by JavaScript producers round-trip byte for byte.
mod number {
    use serde::{Deserialize, Deserializer, Serializer};

    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        f64::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observed_run() -> Value {
        json!({
            "commit": {
                "author": { "email": "dev@example.com", "name": "Dev", "username": "dev" },
                "committer": { "email": "noreply@github.com", "name": "GitHub", "username": "web-flow" },
                "distinct": true,
                "id": "3f2a1c9d8e7b6a5f4e3d2c1b0a998877",
                "message": "Bump collector",
                "timestamp": "2025-01-14T18:02:11Z",
                "tree_id": "aa11bb22",
                "url": "https://github.com/example/pipeline/commit/3f2a1c9d"
            },
            "date": 1736900000000i64,
            "tool": "customSmallerIsBetter",
            "benches": [
                {
                    "name": "dropped_logs_total",
                    "value": 999000,
                    "unit": "count",
                    "extra": "Nightly - Backpressure/OTLP-ATTR-OTLP - Dropped Log Count"
                },
                {
                    "name": "network_tx_bytes_rate_avg",
                    "value": 1523.75,
                    "unit": "bytes/sec",
                    "extra": "Nightly - Syslog - Network Utilization"
                }
            ]
        })
    }

    #[test]
    fn test_run_round_trips_observed_shape() {
        let original = observed_run();
        let run: Run = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(run.benches.len(), 2);
        assert_eq!(run.benches[0].value, 999000.0);

        let written = serde_json::to_value(&run).unwrap();
        assert_eq!(written, original);
    }

    #[test]
    fn test_integral_values_serialize_without_fraction() {
        let sample = Sample::new("dropped_logs_total", 999000.0, "count");
        let text = serde_json::to_string(&sample).unwrap();
        assert!(text.contains("\"value\":999000,"));

        let negative = Sample::new("dropped_logs_percentage", -1.56, "%");
        let text = serde_json::to_string(&negative).unwrap();
        assert!(text.contains("\"value\":-1.56"));
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let mut value = observed_run();
        value["benches"][0]["biggerIsBetter"] = json!(false);
        value["runner"] = json!("nightly-01");

        let run: Run = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(run.other.get("runner"), Some(&json!("nightly-01")));
        assert_eq!(serde_json::to_value(&run).unwrap(), value);
    }

    #[test]
    fn test_sample_lookup_uses_extra() {
        let run: Run = serde_json::from_value(observed_run()).unwrap();
        let extra = "Nightly - Backpressure/OTLP-ATTR-OTLP - Dropped Log Count";
        assert!(run.sample("dropped_logs_total", Some(extra)).is_some());
        assert!(run.sample("dropped_logs_total", None).is_none());
    }

    #[test]
    fn test_short_id_and_published_at() {
        let run: Run = serde_json::from_value(observed_run()).unwrap();
        assert_eq!(run.commit.short_id(), "3f2a1c9");
        assert_eq!(Commit::new("abc", "").short_id(), "abc");
        assert_eq!(short_commit_id("0123456789"), "0123456");
        assert_eq!(
            run.published_at().unwrap().timestamp_millis(),
            1736900000000
        );
    }

    #[test]
    fn test_benchmark_data_uses_camel_case_keys() {
        let mut data = BenchmarkData::new("https://github.com/example/pipeline");
        data.last_update = 42;
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["lastUpdate"], json!(42));
        assert_eq!(value["repoUrl"], json!("https://github.com/example/pipeline"));
        assert_eq!(value["entries"], json!({}));
    }
}
