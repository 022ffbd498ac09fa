// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Generic JSON webhook sink.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::AlertSink;
use crate::alert::Alert;
use crate::error::{EmitError, Result};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    alert: &'a Alert,
}

/// Posts `{"text": <summary>, "alert": <alert>}` to a URL.
///
/// The idempotency key is also sent as the `Idempotency-Key` header so the
/// receiver can deduplicate on its side.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Create a sink posting to `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EmitError::InvalidConfig(format!(
                "webhook url must be http(s), got {:?}",
                url
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, alert: &Alert) -> Result<()> {
        let payload = WebhookPayload {
            text: alert.summary(),
            alert,
        };
        self.client
            .post(&self.url)
            .header("Idempotency-Key", &alert.idempotency_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        debug!(url = %self.url, "Delivered webhook alert");
        Ok(())
    }
}
