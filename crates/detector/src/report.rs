// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown report of a run evaluation.

use std::fmt::Write;

use crate::detector::RunEvaluation;
use crate::verdict::{format_ratio, Verdict};

/// Generate a markdown table with one row per evaluated series.
pub fn generate_run_report(evaluation: &RunEvaluation) -> String {
    let mut output = String::new();

    writeln!(output, "# Benchmark verdicts: {}", evaluation.tool).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Commit: `{}`", evaluation.commit_id).unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "| Metric | Scenario | Value | Unit | Baseline | Ratio | Verdict |"
    )
    .unwrap();
    writeln!(
        output,
        "|--------|----------|-------|------|----------|-------|---------|"
    )
    .unwrap();

    for entry in &evaluation.verdicts {
        let baseline = entry
            .verdict
            .baseline()
            .map(|b| format!("{}", b))
            .unwrap_or_else(|| "-".to_string());
        let ratio = entry
            .verdict
            .ratio()
            .map(format_ratio)
            .unwrap_or_else(|| "-".to_string());
        let marker = match &entry.verdict {
            Verdict::Regression { .. } => format!(":warning: {}", entry.verdict.kind()),
            other => other.kind().to_string(),
        };
        writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} |",
            entry.key.name,
            entry.key.extra.as_deref().unwrap_or(""),
            entry.observation.value,
            entry.observation.unit,
            baseline,
            ratio,
            marker
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    writeln!(
        output,
        "Series: {} · regressions: {} · unit drift: {} · discontinuities: {}",
        evaluation.verdicts.len(),
        evaluation.count("regression"),
        evaluation.count("unit_drift"),
        evaluation.count("discontinuity")
    )
    .unwrap();

    output
}
