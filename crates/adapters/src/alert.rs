// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Alert payloads.

use benchwatch_core::{short_commit_id, Direction, SeriesKey};
use benchwatch_detector::verdict::format_ratio;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Idempotency key for an alert: SHA-256 of the commit id and series key.
pub fn idempotency_key(commit_id: &str, key: &SeriesKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(commit_id.as_bytes());
    hasher.update([0x1e]);
    hasher.update(key.canonical().as_bytes());
    hex::encode(hasher.finalize())
}

/// A user-visible performance regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Exactly-once key for `(commit, series)`
    pub idempotency_key: String,
    /// Regressed series
    pub series: SeriesKey,
    /// Commit that regressed
    pub commit_id: String,
    /// Link to the commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_url: Option<String>,
    /// Publish date of the run, epoch milliseconds
    pub date: i64,
    /// Observed value
    pub value: f64,
    /// Unit of the observed value
    pub unit: String,
    /// Mean of the baseline window
    pub baseline: f64,
    /// `value / baseline`; `"Infinity"` in JSON when the baseline is zero
    #[serde(with = "ratio")]
    pub ratio: f64,
    /// Threshold that was crossed
    pub threshold: f64,
    /// Direction the series was judged with
    pub direction: Direction,
}

impl Alert {
    /// One-line summary for logs and webhook titles.
    pub fn summary(&self) -> String {
        format!(
            "{} regressed {} at {} ({} {} vs baseline {})",
            self.series,
            format_ratio(self.ratio),
            short_commit_id(&self.commit_id),
            self.value,
            self.unit,
            self.baseline
        )
    }

    /// Markdown comment body.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        let limit = match self.direction {
            Direction::SmallerIsBetter => 1.0 + self.threshold,
            Direction::BiggerIsBetter => 1.0 - self.threshold,
        };
        let commit = match &self.commit_url {
            Some(url) => format!("[{}]({})", short_commit_id(&self.commit_id), url),
            None => format!("`{}`", short_commit_id(&self.commit_id)),
        };

        writeln!(output, "# :warning: **Performance Alert** :warning:").unwrap();
        writeln!(output).unwrap();
        writeln!(
            output,
            "Possible performance regression was detected for benchmark **'{}'** at {}.",
            self.series.tool, commit
        )
        .unwrap();
        writeln!(
            output,
            "The result is worse than the baseline beyond the ratio limit ({}).",
            self.direction
        )
        .unwrap();
        writeln!(output).unwrap();
        writeln!(output, "| Metric | Scenario | Current | Baseline | Ratio | Limit |").unwrap();
        writeln!(output, "|--------|----------|---------|----------|-------|-------|").unwrap();
        writeln!(
            output,
            "| `{}` | {} | {} {} | {} {} | {} | {:.2} |",
            self.series.name,
            self.series.extra.as_deref().unwrap_or(""),
            self.value,
            self.unit,
            self.baseline,
            self.unit,
            format_ratio(self.ratio),
            limit
        )
        .unwrap();

        output
    }
}

/// JSON has no infinity; a zero-baseline ratio is written as a string.
mod ratio {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const INFINITY: &str = "Infinity";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) if text == INFINITY => Ok(f64::INFINITY),
            Repr::Text(text) => Err(D::Error::custom(format!("invalid ratio {:?}", text))),
        }
    }
}
