// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Alert emission for Benchwatch.
//!
//! Turns [`Verdict::Regression`](benchwatch_detector::Verdict) results into
//! notifications, exactly once per commit and series. Delivery goes through
//! an injected [`AlertSink`]; an [`AlertLedger`] remembers which alerts were
//! already sent so CI retries do not notify twice.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod alert;
pub mod emitter;
pub mod error;
pub mod ledger;
pub mod sinks;

pub use alert::{idempotency_key, Alert};
pub use emitter::{AlertEmitter, EmitOutcome, EmitSummary};
pub use error::{EmitError, Result};
pub use ledger::AlertLedger;
pub use sinks::AlertSink;
