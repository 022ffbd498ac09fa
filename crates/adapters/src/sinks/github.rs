// Copyright 2025 Benchwatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub commit comment sink.
//!
//! Posts the markdown alert body to
//! `POST {api}/repos/{owner}/{repo}/commits/{sha}/comments`.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::AlertSink;
use crate::alert::Alert;
use crate::error::{EmitError, Result};

/// Default GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("benchwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

/// Comments on the offending commit.
#[derive(Debug, Clone)]
pub struct GithubCommentSink {
    client: reqwest::Client,
    api_url: String,
    repository: String,
    token: String,
}

impl GithubCommentSink {
    /// Create a sink for `repository` (`owner/name`).
    pub fn new(repository: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::with_options(repository, token, DEFAULT_API_URL, Duration::from_secs(30))
    }

    /// Create a sink against a specific API base URL and request timeout.
    pub fn with_options(
        repository: impl Into<String>,
        token: impl Into<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let repository = repository.into();
        let token = token.into();
        let mut parts = repository.split('/');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !valid {
            return Err(EmitError::InvalidConfig(format!(
                "repository must be owner/name, got {:?}",
                repository
            )));
        }
        if token.is_empty() {
            return Err(EmitError::InvalidConfig(
                "GitHub token is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            repository,
            token,
        })
    }

    /// Comment endpoint for `commit_id`.
    pub fn comment_url(&self, commit_id: &str) -> String {
        format!(
            "{}/repos/{}/commits/{}/comments",
            self.api_url, self.repository, commit_id
        )
    }
}

#[async_trait]
impl AlertSink for GithubCommentSink {
    fn name(&self) -> &'static str {
        "github"
    }

    #[instrument(skip(self, alert), fields(commit = %alert.commit_id))]
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        let url = self.comment_url(&alert.commit_id);
        let body = alert.to_markdown();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&CommentBody { body: &body })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmitError::Rejected {
                sink: self.name().to_string(),
                message: format!("{}: {}", status, message),
            });
        }

        debug!(url = %url, "Posted commit comment");
        Ok(())
    }
}
