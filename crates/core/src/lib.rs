// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for Benchwatch.
//!
//! This crate holds the data model shared by every other Benchwatch crate:
//! the persisted benchmark document, the runs and samples inside it, and the
//! series identity used by the regression detector.
//!
//! # Modules
//!
//! - [`run`] - `Run`, `Commit`, `Sample` and the top-level `BenchmarkData` document
//! - [`series`] - `SeriesKey`, `Observation` and the metric `Direction`
//! - [`error`] - Shared error types, including [`MalformedRunError`]

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod run;
pub mod series;

pub use error::{Error, MalformedRunError, Result};
pub use run::{short_commit_id, BenchmarkData, Commit, CommitIdentity, Run, Sample};
pub use series::{Direction, Observation, SeriesKey};
