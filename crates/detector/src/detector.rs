// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Regression detection.
//!
//! Each new observation of a series is compared against the mean of a short
//! window of the observations before it. The comparison is direction-aware:
//! for a smaller-is-better series a rise beyond the threshold is a
//! regression, for a bigger-is-better series a fall is.
//!
//! Real benchmark histories are noisy in ways that would otherwise produce
//! false alerts, so before comparing the detector checks for:
//!
//! - negative or non-finite values (counter resets across restarts);
//! - a unit that differs from the window's (`bits/sec` becoming `bytes/sec`);
//! - a smaller-is-better series collapsing to zero (scenario changes);
//! - optionally, a series that skipped too many runs.
//!
//! Each of these resets the baseline instead of raising a regression.

use benchwatch_benchmarks::SeriesStore;
use benchwatch_core::{Direction, Observation, Run, SeriesKey};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::error::Result;
use crate::verdict::{Discontinuity, Verdict};
use crate::window::{baseline_mean, predominant_unit, BaselineWindow};

/// Verdict for one series of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesVerdict {
    /// Series evaluated
    pub key: SeriesKey,
    /// The new observation
    pub observation: Observation,
    /// Outcome
    pub verdict: Verdict,
    /// Direction the series was judged with
    pub direction: Direction,
    /// Threshold in effect
    pub threshold: f64,
}

/// Verdicts for every sample of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvaluation {
    /// Tool the run belongs to
    pub tool: String,
    /// Commit the run benchmarked
    pub commit_id: String,
    /// Publish date of the run
    pub date: i64,
    /// One verdict per sample, in sample order
    pub verdicts: Vec<SeriesVerdict>,
}

impl RunEvaluation {
    /// Verdicts that are regressions.
    pub fn regressions(&self) -> impl Iterator<Item = &SeriesVerdict> {
        self.verdicts.iter().filter(|v| v.verdict.is_regression())
    }

    /// Whether any series regressed.
    pub fn has_regressions(&self) -> bool {
        self.regressions().next().is_some()
    }

    /// Number of verdicts of the given kind (see [`Verdict::kind`]).
    pub fn count(&self, kind: &str) -> usize {
        self.verdicts
            .iter()
            .filter(|v| v.verdict.kind() == kind)
            .count()
    }
}

/// Direction-aware regression detector.
#[derive(Debug, Clone, Default)]
pub struct RegressionDetector {
    config: DetectorConfig,
}

impl RegressionDetector {
    /// Create a detector, validating the configuration.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in effect.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Direction used for series of `tool`.
    pub fn direction(&self, tool: &str) -> Direction {
        self.config.direction_for(tool)
    }

    /// Evaluate `observation` against `prior_window`, the most recent
    /// comparable observations of the same series, oldest first.
    pub fn evaluate(
        &self,
        key: &SeriesKey,
        observation: &Observation,
        prior_window: &[Observation],
    ) -> Verdict {
        let value = observation.value;
        if !value.is_finite() {
            return Verdict::Discontinuity(Discontinuity::NonFinite);
        }
        if value < 0.0 {
            return Verdict::Discontinuity(Discontinuity::NegativeValue);
        }

        let Some(previous) = prior_window.last() else {
            return Verdict::Baseline;
        };

        if let Some(max_gap) = self.config.max_gap_runs {
            let missing_runs = observation
                .run_index
                .saturating_sub(previous.run_index)
                .saturating_sub(1);
            if missing_runs > max_gap {
                return Verdict::Discontinuity(Discontinuity::Gap { missing_runs });
            }
        }

        if let Some(expected) = predominant_unit(prior_window) {
            if expected != observation.unit {
                return Verdict::UnitDrift {
                    expected: expected.to_string(),
                    found: observation.unit.clone(),
                };
            }
        }

        let Some(baseline) = baseline_mean(prior_window) else {
            return Verdict::Baseline;
        };
        let direction = self.direction(&key.tool);
        let threshold = self.config.threshold;

        if baseline == 0.0 {
            if value == 0.0 {
                return Verdict::Nominal {
                    ratio: 1.0,
                    baseline,
                };
            }
            return match direction {
                Direction::SmallerIsBetter => Verdict::Regression {
                    ratio: f64::INFINITY,
                    baseline,
                },
                Direction::BiggerIsBetter => Verdict::Nominal {
                    ratio: f64::INFINITY,
                    baseline,
                },
            };
        }

        if value == 0.0 && direction == Direction::SmallerIsBetter {
            return Verdict::Discontinuity(Discontinuity::CollapseToZero);
        }

        let ratio = value / baseline;
        let regressed = match direction {
            Direction::SmallerIsBetter => ratio > 1.0 + threshold,
            Direction::BiggerIsBetter => ratio < 1.0 - threshold,
        };

        if regressed {
            Verdict::Regression { ratio, baseline }
        } else {
            Verdict::Nominal { ratio, baseline }
        }
    }

    /// Replay a series history, returning the verdict of every observation
    /// and the window left for the next one.
    pub fn replay<I>(&self, key: &SeriesKey, history: I) -> (Vec<Verdict>, BaselineWindow)
    where
        I: IntoIterator<Item = Observation>,
    {
        let mut window = BaselineWindow::new(self.config.window_size);
        let mut verdicts = Vec::new();
        for observation in history {
            let verdict = self.evaluate(key, &observation, window.observations());
            window.apply(observation, &verdict);
            verdicts.push(verdict);
        }
        (verdicts, window)
    }

    /// Baseline window left after replaying `history`.
    pub fn window<I>(&self, key: &SeriesKey, history: I) -> BaselineWindow
    where
        I: IntoIterator<Item = Observation>,
    {
        self.replay(key, history).1
    }

    /// Evaluate every sample of `run` against the history that precedes it.
    ///
    /// If `run` is already stored (a retried publish), only the runs before it
    /// form its history.
    pub fn evaluate_run(&self, store: &SeriesStore, tool: &str, run: &Run) -> RunEvaluation {
        let run_index = store
            .position(tool, &run.commit.id, run.date)
            .unwrap_or_else(|| store.runs(tool).len());
        let direction = self.direction(tool);

        let verdicts = run
            .benches
            .iter()
            .map(|sample| {
                let key = sample.series_key(tool);
                let history = store.query_key(&key).before(run_index);
                let window = self.window(&key, history.iter());
                let observation = Observation::new(
                    run.date,
                    run.commit.id.clone(),
                    sample.value,
                    sample.unit.clone(),
                    run_index,
                );
                let verdict = self.evaluate(&key, &observation, window.observations());
                record(&key, &observation, &verdict);
                SeriesVerdict {
                    key,
                    observation,
                    verdict,
                    direction,
                    threshold: self.config.threshold,
                }
            })
            .collect();

        RunEvaluation {
            tool: tool.to_string(),
            commit_id: run.commit.id.clone(),
            date: run.date,
            verdicts,
        }
    }
}

fn record(key: &SeriesKey, observation: &Observation, verdict: &Verdict) {
    metrics::counter!("benchwatch_verdicts_total", "verdict" => verdict.kind()).increment(1);
    match verdict {
        Verdict::Regression { ratio, baseline } => warn!(
            series = %key,
            value = observation.value,
            baseline,
            ratio,
            "Performance regression detected"
        ),
        Verdict::UnitDrift { expected, found } => info!(
            series = %key,
            expected = %expected,
            found = %found,
            "Unit changed, baseline reset"
        ),
        Verdict::Discontinuity(cause) => info!(
            series = %key,
            value = observation.value,
            cause = %cause,
            "Discontinuity, baseline reset"
        ),
        Verdict::Baseline | Verdict::Nominal { .. } => debug!(
            series = %key,
            value = observation.value,
            verdict = verdict.kind(),
            "Series evaluated"
        ),
    }
}
