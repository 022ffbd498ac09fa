// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rolling baseline window.
//!
//! The window holds the most recent comparable observations of one series.
//! It follows the verdicts handed to [`BaselineWindow::apply`]:
//!
//! - a discontinuity clears the window and is not itself retained;
//! - unit drift clears the window and the drifted observation starts a new one;
//! - every other verdict pushes the observation, evicting the oldest when full.

use benchwatch_core::Observation;
use std::collections::HashMap;

use crate::verdict::Verdict;

/// Most recent comparable observations of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineWindow {
    capacity: usize,
    observations: Vec<Observation>,
}

impl BaselineWindow {
    /// Create an empty window holding at most `capacity` observations.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            observations: Vec::with_capacity(capacity.max(1)),
        }
    }

    /// Observations in the window, oldest first.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Whether the window holds nothing.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of observations held.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Fold an evaluated observation into the window.
    pub fn apply(&mut self, observation: Observation, verdict: &Verdict) {
        match verdict {
            Verdict::Discontinuity(_) => self.observations.clear(),
            Verdict::UnitDrift { .. } => {
                self.observations.clear();
                self.push(observation);
            }
            Verdict::Baseline | Verdict::Regression { .. } | Verdict::Nominal { .. } => {
                self.push(observation)
            }
        }
    }

    fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
        if self.observations.len() > self.capacity {
            let excess = self.observations.len() - self.capacity;
            self.observations.drain(..excess);
        }
    }
}

/// Most common unit in `window`; ties go to the most recently seen unit.
pub fn predominant_unit(window: &[Observation]) -> Option<&str> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, observation) in window.iter().enumerate() {
        let entry = counts.entry(observation.unit.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = position;
    }
    counts
        .into_iter()
        .max_by_key(|(_, (count, last))| (*count, *last))
        .map(|(unit, _)| unit)
}

/// Mean of the usable (finite, non-negative) values in `window`.
pub fn baseline_mean(window: &[Observation]) -> Option<f64> {
    let values: Vec<f64> = window
        .iter()
        .map(|o| o.value)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
