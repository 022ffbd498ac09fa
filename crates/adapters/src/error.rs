// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Alert emission errors.

use benchwatch_benchmarks::StoreError;
use benchwatch_core::SeriesKey;
use thiserror::Error;

/// Errors that can occur while emitting alerts.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The run has no sample for the regressed series
    #[error("Run has no sample for series {0}")]
    MissingSample(SeriesKey),

    /// Sink configuration is unusable
    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request to a sink failed
    #[error("HTTP error delivering alert: {0}")]
    Http(#[from] reqwest::Error),

    /// Sink rejected the alert
    #[error("Sink {sink} rejected alert: {message}")]
    Rejected {
        /// Sink name
        sink: String,
        /// Reason reported by the sink
        message: String,
    },

    /// Reading or writing the alert ledger failed
    #[error("Alert ledger error: {0}")]
    Ledger(#[from] StoreError),

    /// Ledger serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, EmitError>;
