//! Markdown output generation for the benchmark history.
//!
//! This module renders store summaries and schema-evolution reports for the
//! CLI and for CI job summaries.

use crate::schema::SchemaChange;
use crate::store::SeriesStore;
use chrono::DateTime;
use std::fmt::Write;

fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Generate a markdown summary of the store.
pub fn generate_summary(store: &SeriesStore) -> String {
    let mut output = String::new();

    writeln!(output, "# Benchmark History").unwrap();
    writeln!(output).unwrap();
    if !store.repo_url().is_empty() {
        writeln!(output, "Repository: {}", store.repo_url()).unwrap();
    }
    writeln!(output, "Last update: {}", format_millis(store.last_update())).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Tool | Runs | Series | Latest commit | Latest run |").unwrap();
    writeln!(output, "|------|------|--------|---------------|------------|").unwrap();

    for tool in store.tools() {
        let runs = store.runs(tool);
        let (commit, date) = runs
            .last()
            .map(|r| (r.commit.short_id().to_string(), format_millis(r.date)))
            .unwrap_or_default();
        writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            tool,
            runs.len(),
            store.series_keys(tool).len(),
            commit,
            date
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(output, "Total runs: {}", store.len()).unwrap();

    output
}

/// Generate a markdown report of schema changes for one tool.
pub fn generate_schema_report(tool: &str, changes: &[SchemaChange]) -> String {
    let mut output = String::new();

    writeln!(output, "# Schema changes: {}", tool).unwrap();
    writeln!(output).unwrap();

    if changes.is_empty() {
        writeln!(output, "No runs recorded.").unwrap();
        return output;
    }

    writeln!(output, "| Run | Change | Metric | Scenario | Detail |").unwrap();
    writeln!(output, "|-----|--------|--------|----------|--------|").unwrap();

    for change in changes {
        let key = change.key();
        let extra = key.extra.as_deref().unwrap_or("");
        let (run, kind, detail) = match change {
            SchemaChange::MetricAdded { run_index, unit, .. } => {
                (*run_index, "added", format!("unit `{}`", unit))
            }
            SchemaChange::UnitChanged {
                run_index, from, to, ..
            } => (*run_index, "unit changed", format!("`{}` → `{}`", from, to)),
            SchemaChange::MetricRetired { last_run_index, .. } => {
                (*last_run_index, "retired", "last reported here".to_string())
            }
        };
        writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            run, kind, key.name, extra, detail
        )
        .unwrap();
    }

    output
}
