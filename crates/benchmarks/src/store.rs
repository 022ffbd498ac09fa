//! Append-only benchmark-history store.
//!
//! The store owns a [`BenchmarkData`] document and exposes it as a set of
//! per-series histories. Runs are only ever appended; a run that was already
//! published (same tool, commit and date) is recognized and ignored so that
//! a retried CI job cannot duplicate history.

use benchwatch_core::{BenchmarkData, MalformedRunError, Observation, Run, SeriesKey};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::schema::{self, SchemaChange};

/// Outcome of [`SeriesStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreResult {
    /// The run was added at `index` in the tool's run list.
    Appended {
        /// Position of the new run
        index: usize,
    },
    /// An identical `(tool, commit, date)` run already exists at `index`.
    Duplicate {
        /// Position of the existing run
        index: usize,
    },
}

impl StoreResult {
    /// Position of the run in the tool's run list.
    pub fn index(&self) -> usize {
        match self {
            StoreResult::Appended { index } | StoreResult::Duplicate { index } => *index,
        }
    }

    /// Whether the append changed the store.
    pub fn is_appended(&self) -> bool {
        matches!(self, StoreResult::Appended { .. })
    }
}

/// Check the structural preconditions of a run appended under `tool`.
///
/// Every problem is collected; the run is rejected if any is found.
pub fn validate_run(tool: &str, run: &Run) -> std::result::Result<(), MalformedRunError> {
    let mut problems = Vec::new();

    if tool.trim().is_empty() {
        problems.push("tool is empty".to_string());
    }
    if !run.tool.is_empty() && run.tool != tool {
        problems.push(format!(
            "run.tool `{}` does not match target tool `{}`",
            run.tool, tool
        ));
    }
    if run.commit.id.trim().is_empty() {
        problems.push("commit.id is empty".to_string());
    }
    if run.benches.is_empty() {
        problems.push("benches is empty".to_string());
    }

    let mut seen = HashSet::new();
    for (i, sample) in run.benches.iter().enumerate() {
        if sample.name.trim().is_empty() {
            problems.push(format!("benches[{}].name is empty", i));
        }
        if !sample.value.is_finite() {
            problems.push(format!(
                "benches[{}] `{}` has non-finite value {}",
                i, sample.name, sample.value
            ));
        }
        if !seen.insert((sample.name.as_str(), sample.extra.as_deref())) {
            problems.push(format!(
                "benches[{}] duplicates metric `{}` with extra {:?}",
                i, sample.name, sample.extra
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(MalformedRunError::from_problems(problems))
    }
}

/// Explicitly owned benchmark-history store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesStore {
    data: BenchmarkData,
}

impl SeriesStore {
    /// Create an empty store for a repository.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            data: BenchmarkData::new(repo_url),
        }
    }

    /// Wrap an existing document.
    pub fn from_data(data: BenchmarkData) -> Self {
        Self { data }
    }

    /// Borrow the underlying document.
    pub fn data(&self) -> &BenchmarkData {
        &self.data
    }

    /// Consume the store, returning the document.
    pub fn into_data(self) -> BenchmarkData {
        self.data
    }

    /// Repository URL recorded in the document.
    pub fn repo_url(&self) -> &str {
        &self.data.repo_url
    }

    /// Set the repository URL if none is recorded yet.
    pub fn set_repo_url_if_empty(&mut self, repo_url: &str) {
        if self.data.repo_url.is_empty() {
            self.data.repo_url = repo_url.to_string();
        }
    }

    /// Time of the most recent append, epoch milliseconds.
    pub fn last_update(&self) -> i64 {
        self.data.last_update
    }

    /// Append a run to the end of `tool`'s history.
    ///
    /// Appending a run whose `(commit.id, date)` already exists for `tool`
    /// returns [`StoreResult::Duplicate`] and leaves the store untouched.
    pub fn append(&mut self, tool: &str, mut run: Run) -> Result<StoreResult> {
        validate_run(tool, &run)?;

        if let Some(index) = self.position(tool, &run.commit.id, run.date) {
            debug!(
                tool = %tool,
                commit = %run.commit.id,
                date = run.date,
                index,
                "Run already stored, skipping append"
            );
            return Ok(StoreResult::Duplicate { index });
        }

        if let Some(last) = self.runs(tool).last() {
            if run.date < last.date {
                return Err(StoreError::OutOfOrder {
                    tool: tool.to_string(),
                    commit_id: run.commit.id.clone(),
                    date: run.date,
                    last_date: last.date,
                });
            }
        }

        if run.tool.is_empty() {
            run.tool = tool.to_string();
        }

        let date = run.date;
        let commit_id = run.commit.id.clone();
        let samples = run.benches.len();

        let runs = self.data.entries.entry(tool.to_string()).or_default();
        runs.push(run);
        let index = runs.len() - 1;

        if date > self.data.last_update {
            self.data.last_update = date;
        }

        metrics::counter!("benchwatch_runs_appended_total", "tool" => tool.to_string())
            .increment(1);
        info!(
            tool = %tool,
            commit = %commit_id,
            date,
            samples,
            index,
            "Run appended"
        );

        Ok(StoreResult::Appended { index })
    }

    /// Position of the run published for `(commit_id, date)` under `tool`.
    pub fn position(&self, tool: &str, commit_id: &str, date: i64) -> Option<usize> {
        self.runs(tool)
            .iter()
            .position(|run| run.is_same_publish(commit_id, date))
    }

    /// The latest run of `tool` if `run` repeats it: same commit, identical
    /// samples, and dated no more than `window_ms` after it.
    ///
    /// Used to recognise a retried publish whose date was stamped at ingest
    /// time and so differs between attempts.
    pub fn find_retry(&self, tool: &str, run: &Run, window_ms: i64) -> Option<&Run> {
        let last = self.runs(tool).last()?;
        let elapsed = run.date - last.date;
        (last.commit.id == run.commit.id
            && last.benches == run.benches
            && (0..=window_ms).contains(&elapsed))
        .then_some(last)
    }

    /// Runs stored for `tool`, in append order.
    pub fn runs(&self, tool: &str) -> &[Run] {
        self.data
            .entries
            .get(tool)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tools with at least one stored run.
    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.data.entries.keys().map(String::as_str)
    }

    /// Total number of runs across all tools.
    pub fn len(&self) -> usize {
        self.data.entries.values().map(Vec::len).sum()
    }

    /// Whether no run has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct series keys of `tool`, in order of first appearance.
    pub fn series_keys(&self, tool: &str) -> Vec<SeriesKey> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for run in self.runs(tool) {
            for sample in &run.benches {
                let key = sample.series_key(tool);
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// History of one series, in append order.
    ///
    /// The returned [`Series`] is lazy and can be iterated any number of
    /// times; each pass sees the runs stored when `query` was called.
    pub fn query(&self, tool: &str, name: &str, extra: Option<&str>) -> Series<'_> {
        Series {
            runs: self.runs(tool),
            name: name.to_string(),
            extra: extra.map(str::to_string),
        }
    }

    /// History of the series identified by `key`.
    pub fn query_key(&self, key: &SeriesKey) -> Series<'_> {
        self.query(&key.tool, &key.name, key.extra.as_deref())
    }

    /// Schema evolution of `tool`: metrics added, retired and re-united.
    pub fn schema_changes(&self, tool: &str) -> Vec<SchemaChange> {
        schema::schema_changes(tool, self.runs(tool))
    }
}

/// Lazy, restartable view of one series.
#[derive(Debug, Clone)]
pub struct Series<'a> {
    runs: &'a [Run],
    name: String,
    extra: Option<String>,
}

impl<'a> Series<'a> {
    /// Iterate the observations in append order.
    pub fn iter(&self) -> SeriesIter<'_> {
        SeriesIter {
            runs: self.runs.iter().enumerate(),
            name: &self.name,
            extra: self.extra.as_deref(),
        }
    }

    /// Observations of runs strictly before `run_index`.
    pub fn before(&self, run_index: usize) -> Series<'a> {
        Series {
            runs: &self.runs[..run_index.min(self.runs.len())],
            name: self.name.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Number of runs that contain this series.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no run contains this series.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Collect the observations.
    pub fn to_vec(&self) -> Vec<Observation> {
        self.iter().collect()
    }
}

impl<'s, 'a> IntoIterator for &'s Series<'a> {
    type Item = Observation;
    type IntoIter = SeriesIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`Series`].
#[derive(Debug, Clone)]
pub struct SeriesIter<'s> {
    runs: std::iter::Enumerate<std::slice::Iter<'s, Run>>,
    name: &'s str,
    extra: Option<&'s str>,
}

impl<'s> Iterator for SeriesIter<'s> {
    type Item = Observation;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, run) in self.runs.by_ref() {
            if let Some(sample) = run.sample(self.name, self.extra) {
                return Some(Observation::new(
                    run.date,
                    run.commit.id.clone(),
                    sample.value,
                    sample.unit.clone(),
                    index,
                ));
            }
        }
        None
    }
}
