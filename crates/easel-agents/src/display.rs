//! Local frame display: the composed 800x480 frame as a file plus a refresh
//! hook.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use easel_core::{FrameDisplay, PromotionError, PromotionMetadata};
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::DisplayConfig;
use crate::frame::compose_frame;

/// Sidecar written next to the frame, read by whatever renders the panel.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FrameInfo<'a> {
    pub title: &'a str,
    pub period: String,
    pub candidate_id: &'a str,
    pub score: Option<u32>,
    pub reasoning: &'a str,
    pub shown_at: String,
}

/// Composes the frame, writes it atomically and runs an optional refresh
/// command.
#[derive(Debug, Clone)]
pub struct FileFrameDisplay {
    frame_path: PathBuf,
    refresh_command: Vec<String>,
    refresh_timeout: Duration,
}

impl FileFrameDisplay {
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            frame_path: config.frame_path.clone(),
            refresh_command: config.refresh_command.clone(),
            refresh_timeout: Duration::from_secs(config.refresh_timeout_secs),
        }
    }

    pub fn frame_path(&self) -> &Path {
        &self.frame_path
    }

    /// `<frame>.json`
    pub fn info_path(&self) -> PathBuf {
        self.frame_path.with_extension("json")
    }

    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PromotionError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("partial");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), PromotionError> {
        let Some((program, args)) = self.refresh_command.split_first() else {
            return Ok(());
        };
        let run = Command::new(program).args(args).kill_on_drop(true).output();
        let output = tokio::time::timeout(self.refresh_timeout, run)
            .await
            .map_err(|_| {
                PromotionError::Display(format!(
                    "refresh command timed out after {}s",
                    self.refresh_timeout.as_secs()
                ))
            })?
            .map_err(|e| PromotionError::Display(format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            return Err(PromotionError::Display(format!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FrameDisplay for FileFrameDisplay {
    async fn show(
        &self,
        image: &[u8],
        title: &str,
        metadata: &PromotionMetadata,
    ) -> Result<(), PromotionError> {
        let info = FrameInfo {
            title,
            period: metadata.period_label(),
            candidate_id: &metadata.candidate_id,
            score: metadata.score,
            reasoning: &metadata.reasoning,
            shown_at: chrono::Local::now().format("%H:%M").to_string(),
        };

        let frame = compose_frame(image, metadata)?;
        Self::write_atomic(&self.frame_path, &frame).await?;
        Self::write_atomic(&self.info_path(), &serde_json::to_vec_pretty(&info)?).await?;
        debug!(frame = %self.frame_path.display(), "frame updated");
        self.refresh().await
    }
}

/// Display for headless hosts: logs the winner and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDisplay;

#[async_trait]
impl FrameDisplay for LogDisplay {
    async fn show(
        &self,
        image: &[u8],
        title: &str,
        metadata: &PromotionMetadata,
    ) -> Result<(), PromotionError> {
        info!(
            candidate_id = %metadata.candidate_id,
            title = %title,
            bytes = image.len(),
            "frame display disabled, not showing"
        );
        Ok(())
    }
}
