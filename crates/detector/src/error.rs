// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Detector errors.

use thiserror::Error;

/// Errors that can occur while setting up detection.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Invalid detector configuration
    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for detector operations.
pub type Result<T> = std::result::Result<T, DetectorError>;
