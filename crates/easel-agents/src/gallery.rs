//! Gallery publisher: copies the winner into a git-tracked directory tree.
//!
//! Layout under the gallery root:
//!
//! ```text
//! <date>/period_<n>.png|.rhai|.json                 latest winner of the period
//! <date>/archive/period_<n>_<HHMMSS>.png|.rhai|.json  every promotion, kept
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use easel_core::orchestrator::SOURCE_EXTENSION;
use easel_core::{GalleryPublisher, PromotionError, PromotionMetadata};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::GalleryConfig;

/// Paths written by one publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryFiles {
    pub latest: [PathBuf; 3],
    pub archive: [PathBuf; 3],
}

fn triple(dir: &Path, stem: &str) -> [PathBuf; 3] {
    [
        dir.join(format!("{stem}.png")),
        dir.join(format!("{stem}.{SOURCE_EXTENSION}")),
        dir.join(format!("{stem}.json")),
    ]
}

/// Metadata document stored next to the image.
pub fn metadata_document(
    metadata: &PromotionMetadata,
    at: NaiveDateTime,
) -> Result<String, PromotionError> {
    let mut value = serde_json::to_value(metadata)?;
    if let Value::Object(map) = &mut value {
        map.insert(
            "timestamp".to_string(),
            Value::String(at.format("%Y-%m-%dT%H:%M:%S").to_string()),
        );
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

async fn git(dir: &Path, args: &[&str]) -> Result<String, PromotionError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| PromotionError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PromotionError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Publishes winners into a gallery tree and optionally commits them.
#[derive(Debug, Clone)]
pub struct GitGallery {
    root: PathBuf,
    commit: bool,
    sync_remote: bool,
}

impl GitGallery {
    pub fn new(config: &GalleryConfig) -> Self {
        Self {
            root: config.root.clone(),
            commit: config.commit,
            sync_remote: config.sync_remote,
        }
    }

    /// Write files only, no git.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            commit: false,
            sync_remote: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the latest and archive copies for a promotion made at `at`.
    pub async fn write_files(
        &self,
        image: &[u8],
        source: &str,
        metadata: &PromotionMetadata,
        at: NaiveDateTime,
    ) -> Result<GalleryFiles, PromotionError> {
        let day_dir = self.root.join(metadata.date.to_string());
        let archive_dir = day_dir.join("archive");
        tokio::fs::create_dir_all(&archive_dir).await?;

        let stem = format!("period_{}", metadata.period);
        let files = GalleryFiles {
            latest: triple(&day_dir, &stem),
            archive: triple(&archive_dir, &format!("{stem}_{}", at.format("%H%M%S"))),
        };
        let document = metadata_document(metadata, at)?;

        for [png, code, json] in [&files.archive, &files.latest] {
            tokio::fs::write(png, image).await?;
            tokio::fs::write(code, source).await?;
            tokio::fs::write(json, &document).await?;
        }
        debug!(dir = %day_dir.display(), "gallery files written");
        Ok(files)
    }

    /// Commit everything under the gallery root, syncing with the remote
    /// when configured.
    pub async fn commit(&self, metadata: &PromotionMetadata) -> Result<(), PromotionError> {
        let toplevel = git(&self.root, &["rev-parse", "--show-toplevel"]).await?;
        let repo = PathBuf::from(toplevel);

        if self.sync_remote {
            git(&repo, &["pull", "--rebase"]).await?;
        }
        git(&self.root, &["add", "--", "."]).await?;
        let message = format!("Gallery Update: {} {}", metadata.date, metadata.period_label());
        git(&repo, &["commit", "-m", &message]).await?;
        if self.sync_remote {
            git(&repo, &["push"]).await?;
        }
        Ok(())
    }

    /// Full publication at a given time.
    pub async fn publish_at(
        &self,
        image: &[u8],
        source: &str,
        metadata: &PromotionMetadata,
        at: NaiveDateTime,
    ) -> Result<String, PromotionError> {
        let files = self.write_files(image, source, metadata, at).await?;
        let label = format!("{} {}", metadata.date, metadata.period_label());

        if !self.commit {
            return Ok(format!("Published {label} to {}", files.latest[0].display()));
        }
        self.commit(metadata).await?;
        info!(candidate_id = %metadata.candidate_id, pushed = self.sync_remote, "gallery committed");
        if self.sync_remote {
            Ok(format!("Pushed {label} to gallery remote"))
        } else {
            Ok(format!("Committed {label} to gallery"))
        }
    }
}

#[async_trait]
impl GalleryPublisher for GitGallery {
    async fn publish(
        &self,
        image: &[u8],
        source: &str,
        metadata: &PromotionMetadata,
    ) -> Result<String, PromotionError> {
        self.publish_at(image, source, metadata, chrono::Local::now().naive_local())
            .await
    }
}
