// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Detector configuration.

use benchwatch_core::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{DetectorError, Result};

/// Regression detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Number of recent observations forming the baseline
    pub window_size: usize,
    /// Relative change that counts as a regression (0.5 = 150% of baseline)
    pub threshold: f64,
    /// Runs a series may be missing from before its history is considered broken
    pub max_gap_runs: Option<usize>,
    /// Per-tool direction, overriding the tool-name convention
    pub directions: HashMap<String, Direction>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            threshold: 0.5,
            max_gap_runs: None,
            directions: HashMap::new(),
        }
    }
}

impl DetectorConfig {
    /// Direction of `tool`, honoring overrides.
    pub fn direction_for(&self, tool: &str) -> Direction {
        // Keys loaded from environment variables arrive lowercased.
        self.directions
            .get(tool)
            .or_else(|| {
                self.directions
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(tool))
                    .map(|(_, direction)| direction)
            })
            .copied()
            .unwrap_or_else(|| Direction::from_tool(tool))
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(DetectorError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(DetectorError::InvalidConfig(format!(
                "threshold must be a positive number, got {}",
                self.threshold
            )));
        }
        if self.threshold >= 1.0
            && self
                .directions
                .values()
                .any(|d| *d == Direction::BiggerIsBetter)
        {
            return Err(DetectorError::InvalidConfig(format!(
                "threshold {} can never flag a bigger-is-better regression",
                self.threshold
            )));
        }
        Ok(())
    }
}
