// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared error types.

use std::fmt;
use thiserror::Error;

/// Structurally invalid run input.
///
/// Carries every problem found while validating a run so the CI job can
/// report them all at once instead of failing on the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct MalformedRunError {
    /// Human readable description of each problem.
    pub problems: Vec<String>,
}

impl MalformedRunError {
    /// Create an error with a single problem.
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }

    /// Create an error from a list of problems.
    pub fn from_problems(problems: Vec<String>) -> Self {
        Self { problems }
    }
}

impl fmt::Display for MalformedRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed run: {}", self.problems.join("; "))
    }
}

/// Errors produced by core type operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Run failed structural validation
    #[error(transparent)]
    MalformedRun(#[from] MalformedRunError),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an [`Error::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
