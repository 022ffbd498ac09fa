// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Exactly-once alert emission.
//!
//! An alert is recorded in the ledger only after the sink accepted it, so a
//! failed delivery is retried by the next attempt. If the ledger write fails
//! after a successful delivery the alert is sent again next time; that case
//! is logged at `error!` with the idempotency key.

use benchwatch_core::{Run, SeriesKey};
use benchwatch_detector::{DetectorConfig, RunEvaluation, Verdict};
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::alert::{idempotency_key, Alert};
use crate::error::{EmitError, Result};
use crate::ledger::AlertLedger;
use crate::sinks::AlertSink;

/// What happened to one verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Not a regression; nothing sent
    Suppressed,
    /// Alert delivered and recorded
    Delivered {
        /// Idempotency key of the alert
        key: String,
    },
    /// Alert for this commit and series was already delivered
    AlreadyEmitted {
        /// Idempotency key of the alert
        key: String,
    },
}

/// Summary of [`AlertEmitter::emit_evaluation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
    /// Alerts delivered now
    pub delivered: usize,
    /// Alerts skipped because they were already delivered
    pub already_emitted: usize,
    /// Verdicts that were not regressions
    pub suppressed: usize,
    /// Alerts whose delivery failed
    pub failed: usize,
}

/// Sends regression alerts through a sink, once per commit and series.
pub struct AlertEmitter {
    sink: Box<dyn AlertSink>,
    ledger: AlertLedger,
    config: DetectorConfig,
}

impl AlertEmitter {
    /// Create an emitter. `config` supplies the threshold and direction
    /// reported in alerts.
    pub fn new(sink: Box<dyn AlertSink>, ledger: AlertLedger, config: DetectorConfig) -> Self {
        Self {
            sink,
            ledger,
            config,
        }
    }

    /// The idempotency ledger.
    pub fn ledger(&self) -> &AlertLedger {
        &self.ledger
    }

    /// Emit an alert for `verdict` if it is a regression not yet reported.
    pub async fn emit(
        &mut self,
        tool: &str,
        key: &SeriesKey,
        verdict: &Verdict,
        run: &Run,
    ) -> Result<EmitOutcome> {
        let (ratio, baseline) = match verdict {
            Verdict::Regression { ratio, baseline } => (*ratio, *baseline),
            other => {
                debug!(series = %key, verdict = other.kind(), "Verdict suppressed");
                return Ok(EmitOutcome::Suppressed);
            }
        };

        let idempotency = idempotency_key(&run.commit.id, key);
        if self.ledger.contains(&idempotency) {
            info!(series = %key, commit = %run.commit.id, "Alert already emitted");
            return Ok(EmitOutcome::AlreadyEmitted { key: idempotency });
        }

        let sample = run
            .sample(&key.name, key.extra.as_deref())
            .ok_or_else(|| EmitError::MissingSample(key.clone()))?;

        let alert = Alert {
            idempotency_key: idempotency.clone(),
            series: key.clone(),
            commit_id: run.commit.id.clone(),
            commit_url: run.commit.url.clone(),
            date: run.date,
            value: sample.value,
            unit: sample.unit.clone(),
            baseline,
            ratio,
            threshold: self.config.threshold,
            direction: self.config.direction_for(tool),
        };

        self.sink.deliver(&alert).await?;
        if let Err(e) = self.ledger.record(&idempotency) {
            error!(
                key = %idempotency,
                series = %key,
                commit = %run.commit.id,
                error = %e,
                "Alert delivered but not recorded; it will be delivered again"
            );
            return Err(e);
        }

        counter!("benchwatch_alerts_emitted_total", "sink" => self.sink.name()).increment(1);
        info!(
            sink = self.sink.name(),
            series = %key,
            commit = %run.commit.id,
            ratio,
            "Regression alert delivered"
        );
        Ok(EmitOutcome::Delivered { key: idempotency })
    }

    /// Emit every regression in `evaluation`. Delivery failures are logged
    /// and counted; the remaining alerts are still attempted.
    pub async fn emit_evaluation(
        &mut self,
        evaluation: &RunEvaluation,
        run: &Run,
    ) -> EmitSummary {
        let mut summary = EmitSummary::default();
        for series in &evaluation.verdicts {
            match self
                .emit(&evaluation.tool, &series.key, &series.verdict, run)
                .await
            {
                Ok(EmitOutcome::Suppressed) => summary.suppressed += 1,
                Ok(EmitOutcome::Delivered { .. }) => summary.delivered += 1,
                Ok(EmitOutcome::AlreadyEmitted { .. }) => summary.already_emitted += 1,
                Err(e) => {
                    warn!(series = %series.key, error = %e, "Failed to emit alert");
                    counter!("benchwatch_alert_failures_total", "sink" => self.sink.name())
                        .increment(1);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MockAlertSink;
    use benchwatch_core::{Commit, Sample};

    const TOOL: &str = "customSmallerIsBetter";

    fn run() -> Run {
        Run::new(
            TOOL,
            Commit::new("deadbeef", "nightly"),
            1_000,
            vec![Sample::new("ram_mib_avg", 200.0, "MiB")],
        )
    }

    fn key() -> SeriesKey {
        SeriesKey::new(TOOL, "ram_mib_avg", None)
    }

    fn regression() -> Verdict {
        Verdict::Regression {
            ratio: 2.0,
            baseline: 100.0,
        }
    }

    fn counting_sink(times: usize) -> MockAlertSink {
        let mut sink = MockAlertSink::new();
        sink.expect_name().return_const("mock");
        sink.expect_deliver().times(times).returning(|_| Ok(()));
        sink
    }

    #[tokio::test]
    async fn test_non_regressions_are_suppressed() {
        let mut emitter = AlertEmitter::new(
            Box::new(counting_sink(0)),
            AlertLedger::in_memory(),
            DetectorConfig::default(),
        );
        let verdicts = [
            Verdict::Baseline,
            Verdict::Nominal {
                ratio: 1.0,
                baseline: 200.0,
            },
        ];
        for verdict in &verdicts {
            let outcome = emitter.emit(TOOL, &key(), verdict, &run()).await.unwrap();
            assert_eq!(outcome, EmitOutcome::Suppressed);
        }
    }

    #[tokio::test]
    async fn test_exactly_once_across_repeated_emits() {
        let mut emitter = AlertEmitter::new(
            Box::new(counting_sink(1)),
            AlertLedger::in_memory(),
            DetectorConfig::default(),
        );

        let first = emitter
            .emit(TOOL, &key(), &regression(), &run())
            .await
            .unwrap();
        let second = emitter
            .emit(TOOL, &key(), &regression(), &run())
            .await
            .unwrap();

        assert!(matches!(first, EmitOutcome::Delivered { .. }));
        assert!(matches!(second, EmitOutcome::AlreadyEmitted { .. }));
    }

    #[tokio::test]
    async fn test_exactly_once_across_reloaded_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.json");

        let mut emitter = AlertEmitter::new(
            Box::new(counting_sink(1)),
            AlertLedger::load(&path).unwrap(),
            DetectorConfig::default(),
        );
        emitter
            .emit(TOOL, &key(), &regression(), &run())
            .await
            .unwrap();

        let mut retried = AlertEmitter::new(
            Box::new(counting_sink(0)),
            AlertLedger::load(&path).unwrap(),
            DetectorConfig::default(),
        );
        let outcome = retried
            .emit(TOOL, &key(), &regression(), &run())
            .await
            .unwrap();
        assert!(matches!(outcome, EmitOutcome::AlreadyEmitted { .. }));
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_recorded() {
        let mut sink = MockAlertSink::new();
        sink.expect_name().return_const("mock");
        sink.expect_deliver().times(1).returning(|_| {
            Err(EmitError::Rejected {
                sink: "mock".to_string(),
                message: "unavailable".to_string(),
            })
        });
        let mut emitter = AlertEmitter::new(
            Box::new(sink),
            AlertLedger::in_memory(),
            DetectorConfig::default(),
        );

        assert!(emitter
            .emit(TOOL, &key(), &regression(), &run())
            .await
            .is_err());
        assert!(emitter.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_alert_carries_sample_and_config() {
        let mut sink = MockAlertSink::new();
        sink.expect_name().return_const("mock");
        sink.expect_deliver()
            .withf(|alert: &Alert| {
                alert.value == 200.0
                    && alert.unit == "MiB"
                    && alert.baseline == 100.0
                    && alert.threshold == 0.5
                    && alert.commit_id == "deadbeef"
            })
            .times(1)
            .returning(|_| Ok(()));
        let mut emitter = AlertEmitter::new(
            Box::new(sink),
            AlertLedger::in_memory(),
            DetectorConfig::default(),
        );
        emitter
            .emit(TOOL, &key(), &regression(), &run())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unrecorded_delivery_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_dir = dir.path().join("ledger");
        let ledger = AlertLedger::load(ledger_dir.join("alerts.json")).unwrap();
        // The ledger directory can no longer be created.
        std::fs::write(&ledger_dir, "not a directory").unwrap();

        let mut emitter =
            AlertEmitter::new(Box::new(counting_sink(1)), ledger, DetectorConfig::default());
        let result = emitter.emit(TOOL, &key(), &regression(), &run()).await;

        assert!(matches!(result, Err(EmitError::Ledger(_))));
        assert!(emitter.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_missing_sample_is_an_error() {
        let mut emitter = AlertEmitter::new(
            Box::new(counting_sink(0)),
            AlertLedger::in_memory(),
            DetectorConfig::default(),
        );
        let other = SeriesKey::new(TOOL, "cpu_percentage_avg", None);
        assert!(matches!(
            emitter.emit(TOOL, &other, &regression(), &run()).await,
            Err(EmitError::MissingSample(_))
        ));
    }
}
