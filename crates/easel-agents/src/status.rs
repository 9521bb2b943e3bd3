//! Status sinks: a local JSON file and an HTTP upload.
//!
//! Both overwrite a single document with the latest update. Failures are
//! logged and swallowed; status is best-effort.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use easel_core::{StatusSink, StatusUpdate};
use tracing::{debug, warn};

use crate::error::{AgentError, AgentResult};

/// Overwrites `status.json` on every update.
#[derive(Debug, Clone)]
pub struct JsonStatusFile {
    path: PathBuf,
}

impl JsonStatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, update: &StatusUpdate) -> AgentResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("partial");
        tokio::fs::write(&staging, serde_json::to_vec_pretty(update)?).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusSink for JsonStatusFile {
    async fn update(&self, update: &StatusUpdate) {
        match self.write(update).await {
            Ok(()) => debug!(agent = %update.agent, task = %update.task, "status written"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "status update failed"),
        }
    }
}

/// PUTs the status document to a blob-store style endpoint.
#[derive(Debug, Clone)]
pub struct HttpStatus {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpStatus {
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> AgentResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("easel/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            token,
        })
    }

    async fn put(&self, update: &StatusUpdate) -> AgentResult<()> {
        let mut request = self
            .http
            .put(&self.url)
            .header("x-content-type", "application/json")
            .header("x-add-random-suffix", "0")
            .json(update);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StatusSink for HttpStatus {
    async fn update(&self, update: &StatusUpdate) {
        match self.put(update).await {
            Ok(()) => debug!(agent = %update.agent, task = %update.task, "status uploaded"),
            Err(err) => warn!(url = %self.url, error = %err, "status upload failed"),
        }
    }
}
