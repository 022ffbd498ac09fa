// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Verdict types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a series' history was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum Discontinuity {
    /// Negative value, typically a counter reset across a restart
    NegativeValue,
    /// NaN or infinite value
    NonFinite,
    /// A smaller-is-better series dropped from a positive baseline to zero
    CollapseToZero,
    /// The series was absent from more runs than allowed
    Gap {
        /// Runs that elapsed without the series
        missing_runs: usize,
    },
}

impl fmt::Display for Discontinuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discontinuity::NegativeValue => write!(f, "negative value"),
            Discontinuity::NonFinite => write!(f, "non-finite value"),
            Discontinuity::CollapseToZero => write!(f, "collapse to zero"),
            Discontinuity::Gap { missing_runs } => write!(f, "missing from {} runs", missing_runs),
        }
    }
}

/// Outcome of evaluating one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// First comparable observation; establishes the baseline.
    Baseline,
    /// Unit differs from the baseline's; the observation starts a new baseline.
    UnitDrift {
        /// Predominant unit of the baseline window
        expected: String,
        /// Unit of the new observation
        found: String,
    },
    /// History is broken; the baseline window resets.
    Discontinuity(Discontinuity),
    /// The observation crossed the threshold in the unfavorable direction.
    Regression {
        /// `value / baseline`; infinite when the baseline is zero
        ratio: f64,
        /// Mean of the baseline window
        baseline: f64,
    },
    /// Within threshold, or a favorable change.
    Nominal {
        /// `value / baseline`; infinite when the baseline is zero
        ratio: f64,
        /// Mean of the baseline window
        baseline: f64,
    },
}

impl Verdict {
    /// Whether this verdict should be surfaced to users.
    pub fn is_regression(&self) -> bool {
        matches!(self, Verdict::Regression { .. })
    }

    /// Short lowercase name, used as a log field and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Verdict::Baseline => "baseline",
            Verdict::UnitDrift { .. } => "unit_drift",
            Verdict::Discontinuity(_) => "discontinuity",
            Verdict::Regression { .. } => "regression",
            Verdict::Nominal { .. } => "nominal",
        }
    }

    /// Ratio to baseline, when one was computed.
    pub fn ratio(&self) -> Option<f64> {
        match self {
            Verdict::Regression { ratio, .. } | Verdict::Nominal { ratio, .. } => Some(*ratio),
            _ => None,
        }
    }

    /// Baseline mean, when one was computed.
    pub fn baseline(&self) -> Option<f64> {
        match self {
            Verdict::Regression { baseline, .. } | Verdict::Nominal { baseline, .. } => {
                Some(*baseline)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Baseline => write!(f, "baseline"),
            Verdict::UnitDrift { expected, found } => {
                write!(f, "unit drift ({} → {})", expected, found)
            }
            Verdict::Discontinuity(cause) => write!(f, "discontinuity ({})", cause),
            Verdict::Regression { ratio, .. } => write!(f, "regression ({})", format_ratio(*ratio)),
            Verdict::Nominal { ratio, .. } => write!(f, "nominal ({})", format_ratio(*ratio)),
        }
    }
}

/// Render a ratio as `1.60x`, or `∞` for a zero baseline.
pub fn format_ratio(ratio: f64) -> String {
    if ratio.is_finite() {
        format!("{:.2}x", ratio)
    } else {
        "∞".to_string()
    }
}
