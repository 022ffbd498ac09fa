//! Benchmark-history store for Benchwatch.
//!
//! This crate owns the append-only record of nightly benchmark runs: it
//! validates incoming runs, appends them per tool without touching prior
//! history, and serves per-series histories back to the regression detector
//! and to dashboards.
//!
//! # Quick Start
//!
//! ```no_run
//! use benchwatch_benchmarks::{io, RunIngestor};
//! use benchwatch_core::Commit;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = io::load_store("dev/bench/data.js")?;
//! let output: serde_json::Value = io::read_json("output.json")?;
//! let run = RunIngestor::new("customSmallerIsBetter")
//!     .ingest_harness_output(Commit::new("3f2a1c9", "nightly"), &output)?;
//! store.append("customSmallerIsBetter", run)?;
//! io::save_store(&store, "dev/bench/data.js", io::DataFormat::JavaScript)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`store`] - The `SeriesStore` and its lazy `Series` queries
//! - [`ingest`] - The `RunIngestor`
//! - [`io`] - Reading and writing the persisted document
//! - [`schema`] - Schema-evolution tracking
//! - [`markdown`] - Markdown report generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod ingest;
pub mod io;
pub mod markdown;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use ingest::RunIngestor;
pub use schema::SchemaChange;
pub use store::{Series, SeriesIter, SeriesStore, StoreResult};
