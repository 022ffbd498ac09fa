// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Regression detection for Benchwatch.
//!
//! Evaluates each new benchmark observation against a rolling baseline of the
//! same series and classifies it as a [`Verdict`]: a new baseline, unit
//! drift, a discontinuity, a regression or nominal.
//!
//! # Example
//!
//! ```
//! use benchwatch_core::{Observation, SeriesKey};
//! use benchwatch_detector::{RegressionDetector, Verdict};
//!
//! let detector = RegressionDetector::default();
//! let key = SeriesKey::new("customSmallerIsBetter", "ram_mib_avg", None);
//! let window: Vec<Observation> = (0..3)
//!     .map(|i| Observation::new(i, "c", 100.0, "MiB", i as usize))
//!     .collect();
//!
//! let verdict = detector.evaluate(&key, &Observation::new(3, "c", 160.0, "MiB", 3), &window);
//! assert!(matches!(verdict, Verdict::Regression { .. }));
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod detector;
pub mod error;
pub mod report;
pub mod verdict;
pub mod window;

pub use config::DetectorConfig;
pub use detector::{RegressionDetector, RunEvaluation, SeriesVerdict};
pub use error::{DetectorError, Result};
pub use verdict::{Discontinuity, Verdict};
pub use window::BaselineWindow;
