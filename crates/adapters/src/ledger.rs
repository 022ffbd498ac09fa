// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persisted record of emitted alerts.
//!
//! Stored as `{"emitted": ["<key>", ...]}` next to the benchmark data so a
//! re-run of the same publish job does not alert twice.

use benchwatch_benchmarks::io::write_atomic;
use benchwatch_benchmarks::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    emitted: BTreeSet<String>,
}

/// Set of idempotency keys that have already been delivered.
#[derive(Debug, Default)]
pub struct AlertLedger {
    path: Option<PathBuf>,
    emitted: BTreeSet<String>,
}

impl AlertLedger {
    /// A ledger that lives only for this process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the ledger at `path`. A missing file is an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let emitted = match fs::read_to_string(&path) {
            Ok(text) => {
                let document: LedgerDocument = serde_json::from_str(&text)?;
                document.emitted
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(StoreError::Io { path, source: e }.into()),
        };
        debug!(path = %path.display(), entries = emitted.len(), "Loaded alert ledger");
        Ok(Self {
            path: Some(path),
            emitted,
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether `key` was already emitted.
    pub fn contains(&self, key: &str) -> bool {
        self.emitted.contains(key)
    }

    /// Number of recorded keys.
    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    /// Record `key` and persist the ledger. Returns `false` if it was
    /// already present.
    pub fn record(&mut self, key: &str) -> Result<bool> {
        if !self.emitted.insert(key.to_string()) {
            return Ok(false);
        }
        if let Some(path) = &self.path {
            let document = LedgerDocument {
                emitted: self.emitted.clone(),
            };
            let rendered = serde_json::to_string_pretty(&document)?;
            if let Err(e) = write_atomic(path, rendered.as_bytes()) {
                self.emitted.remove(key);
                return Err(e.into());
            }
        }
        Ok(true)
    }
}
