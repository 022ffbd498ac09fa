// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Alert delivery targets.
//!
//! - **Log**: writes the alert as a structured `warn!` event
//! - **GitHub**: posts the alert as a commit comment
//! - **Webhook**: posts the alert JSON to an arbitrary endpoint
//!
//! # Example
//!
//! ```ignore
//! use benchwatch_adapters::sinks::prelude::*;
//!
//! let sink = GithubCommentSink::new("example/pipeline", token)?;
//! sink.deliver(&alert).await?;
//! ```

use async_trait::async_trait;

use crate::alert::Alert;
use crate::error::Result;

pub mod github;
pub mod log;
pub mod webhook;

/// A destination for regression alerts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Deliver one alert. Must not return `Ok` unless delivery succeeded.
    async fn deliver(&self, alert: &Alert) -> Result<()>;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::github::GithubCommentSink;
    pub use super::log::LogSink;
    pub use super::webhook::WebhookSink;
    pub use super::AlertSink;
}

pub use github::GithubCommentSink;
pub use log::LogSink;
pub use webhook::WebhookSink;
