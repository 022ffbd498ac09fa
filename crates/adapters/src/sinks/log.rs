// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sink that reports alerts through `tracing`.

use async_trait::async_trait;
use tracing::warn;

use super::AlertSink;
use crate::alert::Alert;
use crate::error::Result;

/// Writes each alert as a warning event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, alert: &Alert) -> Result<()> {
        warn!(
            series = %alert.series,
            commit = %alert.commit_id,
            value = alert.value,
            baseline = alert.baseline,
            ratio = alert.ratio,
            unit = %alert.unit,
            "Performance regression: {}",
            alert.summary()
        );
        Ok(())
    }
}
