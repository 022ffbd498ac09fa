//! Run ingestion.
//!
//! Turns what a CI job hands over into a validated [`Run`]. Two input shapes
//! are accepted:
//!
//! - a complete run document (`{ commit, date, tool, benches }`);
//! - harness output in the custom JSON format
//!   (`[{ "name", "unit", "value", "range"?, "extra"? }]`) plus the commit the
//!   job benchmarked.
//!
//! Input is inspected as raw JSON so that every structural problem is
//! reported in one [`MalformedRunError`] rather than only the first.

use benchwatch_core::{Commit, MalformedRunError, Run, Sample};
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::store::validate_run;

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, MalformedRunError>;

/// Validates and assembles runs for one tool.
#[derive(Debug, Clone)]
pub struct RunIngestor {
    tool: String,
    date: Option<i64>,
}

impl RunIngestor {
    /// Create an ingestor for `tool`.
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            date: None,
        }
    }

    /// Publish date to stamp harness output with (default: now).
    pub fn with_date(mut self, date: i64) -> Self {
        self.date = Some(date);
        self
    }

    /// Tool this ingestor produces runs for.
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Validate a typed run.
    pub fn ingest(&self, run: Run) -> Result<Run> {
        validate_run(&self.tool, &run).map_err(|e| {
            warn!(tool = %self.tool, problems = ?e.problems, "Rejected malformed run");
            e
        })?;
        debug!(
            tool = %self.tool,
            commit = %run.commit.id,
            samples = run.benches.len(),
            "Run ingested"
        );
        Ok(run)
    }

    /// Ingest a complete run document.
    pub fn ingest_run_value(&self, value: &Value) -> Result<Run> {
        let mut problems = Vec::new();

        let Some(obj) = value.as_object() else {
            return Err(MalformedRunError::new("run must be a JSON object"));
        };

        let commit = match obj.get("commit") {
            Some(commit) => parse_commit(commit, &mut problems),
            None => {
                problems.push("commit is missing".to_string());
                Commit::default()
            }
        };

        let date = match obj.get("date") {
            Some(date) => match date.as_i64() {
                Some(ms) if ms > 0 => ms,
                _ => {
                    problems.push(format!(
                        "date must be positive epoch milliseconds, got {}",
                        date
                    ));
                    0
                }
            },
            None => self.date.unwrap_or_else(now_millis),
        };

        let tool = match obj.get("tool") {
            Some(Value::String(tool)) => tool.clone(),
            Some(other) => {
                problems.push(format!("tool must be a string, got {}", other));
                String::new()
            }
            None => self.tool.clone(),
        };

        let benches = match obj.get("benches") {
            Some(benches) => parse_samples(benches, "benches", &mut problems),
            None => {
                problems.push("benches is missing".to_string());
                Vec::new()
            }
        };

        let other: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "commit" | "date" | "tool" | "benches"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut run = Run::new(tool, commit, date, benches);
        run.other = other;
        self.finish(run, problems)
    }

    /// Build a run from harness output in the custom JSON format.
    pub fn ingest_harness_output(&self, commit: Commit, output: &Value) -> Result<Run> {
        let mut problems = Vec::new();
        if commit.id.trim().is_empty() {
            problems.push("commit.id is empty".to_string());
        }
        let benches = parse_samples(output, "output", &mut problems);
        let date = self.date.unwrap_or_else(now_millis);
        let run = Run::new(self.tool.clone(), commit, date, benches);
        self.finish(run, problems)
    }

    fn finish(&self, run: Run, mut problems: Vec<String>) -> Result<Run> {
        if let Err(e) = validate_run(&self.tool, &run) {
            for problem in e.problems {
                if !problems.contains(&problem) {
                    problems.push(problem);
                }
            }
        }
        if !problems.is_empty() {
            warn!(tool = %self.tool, problems = ?problems, "Rejected malformed run");
            return Err(MalformedRunError::from_problems(problems));
        }
        self.ingest(run)
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn parse_commit(value: &Value, problems: &mut Vec<String>) -> Commit {
    match serde_json::from_value::<Commit>(value.clone()) {
        Ok(commit) => commit,
        Err(e) => {
            problems.push(format!("commit is invalid: {}", e));
            Commit::default()
        }
    }
}

fn parse_samples(value: &Value, path: &str, problems: &mut Vec<String>) -> Vec<Sample> {
    let Some(items) = value.as_array() else {
        problems.push(format!("{} must be a JSON array", path));
        return Vec::new();
    };

    let mut samples = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            problems.push(format!("{}[{}] is not an object", path, i));
            continue;
        };
        let before = problems.len();

        let name = match obj.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            Some(Value::String(_)) => {
                problems.push(format!("{}[{}].name is empty", path, i));
                String::new()
            }
            _ => {
                problems.push(format!("{}[{}].name is missing", path, i));
                String::new()
            }
        };

        let value = match obj.get("value").and_then(Value::as_f64) {
            Some(v) => v,
            None => {
                problems.push(format!("{}[{}] `{}` has no numeric value", path, i, name));
                0.0
            }
        };

        let unit = optional_string(obj, "unit", path, i, problems).unwrap_or_default();
        let range = optional_string(obj, "range", path, i, problems);
        let extra = optional_string(obj, "extra", path, i, problems);

        if problems.len() > before {
            continue;
        }

        let mut sample = Sample::new(name, value, unit);
        sample.range = range;
        sample.extra = extra;
        sample.other = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "name" | "value" | "unit" | "range" | "extra"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        samples.push(sample);
    }
    samples
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &str,
    path: &str,
    index: usize,
    problems: &mut Vec<String>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            problems.push(format!(
                "{}[{}].{} must be a string, got {}",
                path, index, field, other
            ));
            None
        }
    }
}
