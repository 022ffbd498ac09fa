//! Command implementations.

use anyhow::{bail, Context, Result};
use benchwatch_adapters::sinks::prelude::*;
use benchwatch_adapters::{AlertEmitter, AlertLedger, EmitSummary};
use benchwatch_benchmarks::io::{load_store, read_json, save_store, DataFormat};
use benchwatch_benchmarks::markdown::{generate_schema_report, generate_summary};
use benchwatch_benchmarks::{RunIngestor, SeriesStore};
use benchwatch_core::{short_commit_id, Commit, Run};
use benchwatch_detector::report::generate_run_report;
use benchwatch_detector::{RegressionDetector, RunEvaluation};
use chrono::{DateTime, SecondsFormat};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::settings::{Settings, SinkKind};

/// Exit code for a job that detected regressions with `fail_on_regression`.
pub const EXIT_REGRESSION: i32 = 2;

/// Where the new run comes from.
#[derive(Debug, Clone)]
pub enum RunSource {
    /// Harness output plus a commit object
    Harness {
        /// Custom-format benchmark output
        output: PathBuf,
        /// Commit JSON
        commit: PathBuf,
    },
    /// Complete run document
    Run(PathBuf),
}

/// Inputs shared by `publish` and `check`.
#[derive(Debug, Clone)]
pub struct RunInput {
    /// Benchmark data file
    pub data: PathBuf,
    /// Suite name
    pub tool: String,
    /// Run source
    pub source: RunSource,
    /// Publish date override, epoch milliseconds
    pub date: Option<i64>,
}

impl RunInput {
    fn ingest(&self) -> Result<Run> {
        let mut ingestor = RunIngestor::new(&self.tool);
        if let Some(date) = self.date {
            ingestor = ingestor.with_date(date);
        }

        let run = match &self.source {
            RunSource::Harness { output, commit } => {
                let commit: Commit = read_json(commit)
                    .with_context(|| format!("reading commit {}", commit.display()))?;
                let output: Value = read_json(output)
                    .with_context(|| format!("reading benchmark output {}", output.display()))?;
                ingestor.ingest_harness_output(commit, &output)?
            }
            RunSource::Run(path) => {
                let value: Value =
                    read_json(path).with_context(|| format!("reading run {}", path.display()))?;
                ingestor.ingest_run_value(&value)?
            }
        };
        Ok(run)
    }
}

impl RunInput {
    /// Ingest the run and, when no date was given, recognise a retry of the
    /// latest stored run so it keeps the date of the first attempt.
    fn ingest_into(&self, store: &SeriesStore, settings: &Settings) -> Result<Run> {
        let mut run = self.ingest()?;
        if self.date.is_none() {
            if let Some(previous) =
                store.find_retry(&self.tool, &run, settings.retry_window_ms())
            {
                info!(
                    tool = %self.tool,
                    commit = %run.commit.id,
                    date = previous.date,
                    "Run repeats the latest publish; reusing its date"
                );
                run.date = previous.date;
            }
        }
        Ok(run)
    }
}

fn load(data: &Path) -> Result<SeriesStore> {
    load_store(data).with_context(|| format!("loading benchmark data {}", data.display()))
}

fn evaluate(
    settings: &Settings,
    store: &SeriesStore,
    input: &RunInput,
    run: &Run,
) -> Result<RunEvaluation> {
    let detector = RegressionDetector::new(settings.detector.clone())
        .context("invalid detector configuration")?;
    Ok(detector.evaluate_run(store, &input.tool, run))
}

fn exit_code(settings: &Settings, evaluation: &RunEvaluation) -> i32 {
    if settings.fail_on_regression && evaluation.has_regressions() {
        EXIT_REGRESSION
    } else {
        0
    }
}

/// Build the configured emitter, or `None` when alerts are disabled.
pub fn build_emitter(settings: &Settings, data: &Path) -> Result<Option<AlertEmitter>> {
    let alerts = &settings.alerts;
    let sink: Box<dyn AlertSink> = match alerts.sink {
        SinkKind::None => return Ok(None),
        SinkKind::Log => Box::new(LogSink),
        SinkKind::Github => {
            let repository = alerts
                .github_repository
                .clone()
                .context("alerts.github_repository is required for the github sink")?;
            let token = alerts
                .github_token
                .clone()
                .or_else(|| std::env::var("GITHUB_TOKEN").ok())
                .context("a GitHub token is required for the github sink")?;
            Box::new(GithubCommentSink::with_options(
                repository,
                token,
                alerts.github_api_url.clone(),
                alerts.http_timeout(),
            )?)
        }
        SinkKind::Webhook => {
            let url = alerts
                .webhook_url
                .clone()
                .context("alerts.webhook_url is required for the webhook sink")?;
            Box::new(WebhookSink::new(url, alerts.http_timeout())?)
        }
    };

    let ledger_path = alerts.ledger_path_for(data);
    let ledger = AlertLedger::load(&ledger_path)
        .with_context(|| format!("loading alert ledger {}", ledger_path.display()))?;
    Ok(Some(AlertEmitter::new(
        sink,
        ledger,
        settings.detector.clone(),
    )))
}

/// Ingest a run, evaluate it, append and save it, then emit alerts.
///
/// The run is evaluated before it is appended so the verdicts only see the
/// history that precedes it. A retried publish leaves the data file
/// untouched and the ledger suppresses repeated alerts.
pub async fn publish(
    settings: &Settings,
    input: &RunInput,
    repo_url: Option<&str>,
) -> Result<i32> {
    let mut store = load(&input.data)?;
    if let Some(url) = repo_url {
        store.set_repo_url_if_empty(url);
    }

    let run = input.ingest_into(&store, settings)?;
    let evaluation = match evaluate(settings, &store, input, &run) {
        Ok(evaluation) => Some(evaluation),
        Err(e) => {
            warn!(error = %e, "Regression detection failed; the run is still published");
            None
        }
    };

    let result = store
        .append(&input.tool, run.clone())
        .with_context(|| format!("appending run for commit {}", run.commit.id))?;
    if result.is_appended() {
        save_store(&store, &input.data, DataFormat::from_path(&input.data))
            .with_context(|| format!("saving benchmark data {}", input.data.display()))?;
        info!(
            tool = %input.tool,
            commit = %run.commit.id,
            index = result.index(),
            "Published run"
        );
    } else {
        info!(tool = %input.tool, commit = %run.commit.id, "Run already published");
    }

    let Some(evaluation) = evaluation else {
        return Ok(0);
    };
    println!("{}", generate_run_report(&evaluation));

    if let Some(mut emitter) = build_emitter(settings, &input.data)? {
        let summary: EmitSummary = emitter.emit_evaluation(&evaluation, &run).await;
        info!(
            delivered = summary.delivered,
            already_emitted = summary.already_emitted,
            failed = summary.failed,
            "Alerts processed"
        );
    }

    Ok(exit_code(settings, &evaluation))
}

/// Evaluate a run without touching the data file or emitting alerts.
pub fn check(settings: &Settings, input: &RunInput) -> Result<i32> {
    let store = load(&input.data)?;
    let run = input.ingest_into(&store, settings)?;
    let evaluation = evaluate(settings, &store, input, &run)?;
    println!("{}", generate_run_report(&evaluation));
    Ok(exit_code(settings, &evaluation))
}

/// Render one series, one observation per line.
pub fn query(
    data: &Path,
    tool: &str,
    name: &str,
    extra: Option<&str>,
    json: bool,
) -> Result<String> {
    let store = load(data)?;
    let series = store.query(tool, name, extra);
    if series.is_empty() {
        bail!("no observations for {} in tool {}", name, tool);
    }

    let mut output = String::new();
    for observation in &series {
        let line = if json {
            serde_json::to_string(&observation)?
        } else {
            let date = DateTime::from_timestamp_millis(observation.date)
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| observation.date.to_string());
            format!(
                "{}\t{}\t{} {}",
                date,
                short_commit_id(&observation.commit_id),
                observation.value,
                observation.unit
            )
        };
        output.push_str(&line);
        output.push('\n');
    }
    Ok(output)
}

/// Render the schema-evolution events of a tool.
pub fn schema(data: &Path, tool: &str) -> Result<String> {
    let store = load(data)?;
    Ok(generate_schema_report(tool, &store.schema_changes(tool)))
}

/// Render a summary of the data file.
pub fn status(data: &Path) -> Result<String> {
    let store = load(data)?;
    Ok(generate_summary(&store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    const TOOL: &str = "customSmallerIsBetter";

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn data(&self) -> PathBuf {
            self.dir.path().join("data.js")
        }

        fn input(&self, night: i64, value: f64) -> RunInput {
            let commit = self.dir.path().join(format!("commit-{}.json", night));
            let output = self.dir.path().join(format!("output-{}.json", night));
            fs::write(
                &commit,
                json!({"id": format!("commit{:04}", night), "message": "nightly"}).to_string(),
            )
            .unwrap();
            fs::write(
                &output,
                json!([{"name": "ram_mib_avg", "unit": "MiB", "value": value}]).to_string(),
            )
            .unwrap();
            RunInput {
                data: self.data(),
                tool: TOOL.to_string(),
                source: RunSource::Harness { output, commit },
                date: Some(1_736_900_000_000 + night * 86_400_000),
            }
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.alerts.sink = SinkKind::None;
        settings
    }

    #[tokio::test]
    async fn test_publish_appends_and_saves() {
        let fixture = Fixture::new();
        let code = publish(&settings(), &fixture.input(0, 100.0), Some("https://example.com/repo"))
            .await
            .unwrap();
        assert_eq!(code, 0);

        let store = load_store(fixture.data()).unwrap();
        assert_eq!(store.runs(TOOL).len(), 1);
        assert_eq!(store.repo_url(), "https://example.com/repo");
        let text = fs::read_to_string(fixture.data()).unwrap();
        assert!(text.starts_with("window.BENCHMARK_DATA = "));
    }

    #[tokio::test]
    async fn test_retried_publish_leaves_file_unchanged() {
        let fixture = Fixture::new();
        let input = fixture.input(0, 100.0);
        publish(&settings(), &input, None).await.unwrap();
        let before = fs::read(fixture.data()).unwrap();

        publish(&settings(), &input, None).await.unwrap();
        assert_eq!(fs::read(fixture.data()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_retried_publish_without_date_appends_once() {
        let fixture = Fixture::new();
        let mut input = fixture.input(0, 100.0);
        input.date = None;

        publish(&settings(), &input, None).await.unwrap();
        publish(&settings(), &input, None).await.unwrap();
        assert_eq!(load_store(fixture.data()).unwrap().runs(TOOL).len(), 1);
    }

    #[tokio::test]
    async fn test_rebenchmark_outside_retry_window_appends() {
        let fixture = Fixture::new();
        publish(&settings(), &fixture.input(0, 100.0), None).await.unwrap();

        // Same commit and results, published long after the stored run.
        let mut input = fixture.input(0, 100.0);
        input.date = None;
        publish(&settings(), &input, None).await.unwrap();
        assert_eq!(load_store(fixture.data()).unwrap().runs(TOOL).len(), 2);
    }

    #[tokio::test]
    async fn test_regression_fails_job_when_configured() {
        let fixture = Fixture::new();
        let mut settings = settings();
        settings.fail_on_regression = true;

        publish(&settings, &fixture.input(0, 100.0), None).await.unwrap();
        let code = publish(&settings, &fixture.input(1, 200.0), None)
            .await
            .unwrap();
        assert_eq!(code, EXIT_REGRESSION);
        // Regressions are still persisted.
        assert_eq!(load_store(fixture.data()).unwrap().runs(TOOL).len(), 2);
    }

    #[tokio::test]
    async fn test_log_sink_records_alert_in_ledger() {
        let fixture = Fixture::new();
        let mut settings = settings();
        settings.alerts.sink = SinkKind::Log;

        publish(&settings, &fixture.input(0, 100.0), None).await.unwrap();
        publish(&settings, &fixture.input(1, 200.0), None).await.unwrap();

        let ledger =
            AlertLedger::load(settings.alerts.ledger_path_for(&fixture.data())).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_is_rejected() {
        let fixture = Fixture::new();
        let input = fixture.input(0, 100.0);
        if let RunSource::Harness { output, .. } = &input.source {
            fs::write(output, "[]").unwrap();
        }
        assert!(publish(&settings(), &input, None).await.is_err());
        assert!(!fixture.data().exists());
    }

    #[test]
    fn test_check_does_not_write() {
        let fixture = Fixture::new();
        let code = check(&settings(), &fixture.input(0, 100.0)).unwrap();
        assert_eq!(code, 0);
        assert!(!fixture.data().exists());
    }

    #[tokio::test]
    async fn test_query_renders_one_line_per_observation() {
        let fixture = Fixture::new();
        publish(&settings(), &fixture.input(0, 100.0), None).await.unwrap();
        publish(&settings(), &fixture.input(1, 110.0), None).await.unwrap();

        let text = query(&fixture.data(), TOOL, "ram_mib_avg", None, false).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "2025-01-15T00:13:20Z\tcommit0\t100 MiB",
                "2025-01-16T00:13:20Z\tcommit0\t110 MiB",
            ]
        );
    }

    #[tokio::test]
    async fn test_query_json_lines() {
        let fixture = Fixture::new();
        publish(&settings(), &fixture.input(0, 100.0), None).await.unwrap();

        let text = query(&fixture.data(), TOOL, "ram_mib_avg", None, true).unwrap();
        let value: Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["commit_id"], "commit0000");
        assert_eq!(value["value"], 100.0);
        assert_eq!(value["unit"], "MiB");
        assert_eq!(value["run_index"], 0);
    }

    #[tokio::test]
    async fn test_query_unknown_series_is_an_error() {
        let fixture = Fixture::new();
        publish(&settings(), &fixture.input(0, 100.0), None).await.unwrap();

        let err = query(&fixture.data(), TOOL, "cpu_percentage_avg", None, false).unwrap_err();
        assert!(err.to_string().contains("no observations for cpu_percentage_avg"));
        assert!(query(&fixture.data(), TOOL, "ram_mib_avg", Some("Nightly"), false).is_err());
    }

    #[tokio::test]
    async fn test_schema_lists_added_metric() {
        let fixture = Fixture::new();
        publish(&settings(), &fixture.input(0, 100.0), None).await.unwrap();

        let text = schema(&fixture.data(), TOOL).unwrap();
        assert!(text.starts_with("# Schema changes: customSmallerIsBetter"));
        assert!(text.contains("| 0 | added | ram_mib_avg |  | unit `MiB` |"));
    }

    #[tokio::test]
    async fn test_status_summarises_tools() {
        let fixture = Fixture::new();
        publish(&settings(), &fixture.input(0, 100.0), None).await.unwrap();

        let text = status(&fixture.data()).unwrap();
        assert!(text.contains("| customSmallerIsBetter | 1 | 1 | commit0 |"));
    }

    #[test]
    fn test_status_of_missing_file_is_empty() {
        let fixture = Fixture::new();
        let text = status(&fixture.data()).unwrap();
        assert!(text.starts_with("# Benchmark History"));
        assert!(!text.contains(TOOL));
    }

    #[test]
    fn test_github_sink_requires_repository() {
        let fixture = Fixture::new();
        let mut settings = settings();
        settings.alerts.sink = SinkKind::Github;
        assert!(build_emitter(&settings, &fixture.data()).is_err());
    }
}
