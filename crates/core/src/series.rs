// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Series identity and observations.
//!
//! A metric name alone does not identify a comparable time series: the same
//! name is reused across scenarios within one run. The true identity is the
//! triple `(tool, name, extra)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a comparable time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Benchmark suite
    pub tool: String,
    /// Metric name
    pub name: String,
    /// Scenario label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl SeriesKey {
    /// Create a new series key.
    pub fn new(tool: impl Into<String>, name: impl Into<String>, extra: Option<String>) -> Self {
        Self {
            tool: tool.into(),
            name: name.into(),
            extra,
        }
    }

    /// Stable textual form used for hashing and logs.
    ///
    /// Fields are separated by the ASCII unit separator so that no
    /// combination of names and labels can collide.
    pub fn canonical(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}",
            self.tool,
            self.name,
            self.extra.as_deref().unwrap_or("")
        )
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extra {
            Some(extra) => write!(f, "{}/{} [{}]", self.tool, self.name, extra),
            None => write!(f, "{}/{}", self.tool, self.name),
        }
    }
}

/// One point of a series, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Publish timestamp of the run, epoch milliseconds
    pub date: i64,
    /// Commit the run benchmarked
    pub commit_id: String,
    /// Measured value
    pub value: f64,
    /// Unit reported with the value
    pub unit: String,
    /// Position of the run in the tool's run list
    pub run_index: usize,
}

impl Observation {
    /// Create a new observation.
    pub fn new(
        date: i64,
        commit_id: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        run_index: usize,
    ) -> Self {
        Self {
            date,
            commit_id: commit_id.into(),
            value,
            unit: unit.into(),
            run_index,
        }
    }
}

/// Which way a metric improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Lower values are better (latency, dropped logs, memory)
    SmallerIsBetter,
    /// Higher values are better (throughput)
    BiggerIsBetter,
}

impl Direction {
    /// Infer the direction from the tool naming convention.
    ///
    /// `customBiggerIsBetter` (any casing) is bigger-is-better; every other
    /// tool, including `customSmallerIsBetter` and timing harnesses such as
    /// `cargo` or `go`, reports durations and is smaller-is-better.
    pub fn from_tool(tool: &str) -> Self {
        if tool.to_ascii_lowercase().contains("biggerisbetter") {
            Direction::BiggerIsBetter
        } else {
            Direction::SmallerIsBetter
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::SmallerIsBetter => write!(f, "smaller is better"),
            Direction::BiggerIsBetter => write!(f, "bigger is better"),
        }
    }
}
