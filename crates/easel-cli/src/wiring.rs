//! Builds the collaborator set for a cycle from [`Settings`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use easel_agents::{
    FileFrameDisplay, GitGallery, HttpStatus, JsonStatusFile, LogDisplay, MessagesGenerator,
    MessagesJudge, StatusKind,
};
use easel_core::{Collaborators, FileLedger, FrameDisplay, LogStatus, StatusSink};

use crate::settings::Settings;

/// Secrets supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub api_key: Option<String>,
    pub status_token: Option<String>,
}

pub fn status_sink(settings: &Settings, token: Option<String>) -> Result<Arc<dyn StatusSink>> {
    let config = &settings.status;
    Ok(match config.kind {
        StatusKind::Log => Arc::new(LogStatus),
        StatusKind::File => Arc::new(JsonStatusFile::new(&config.path)),
        StatusKind::Http => {
            let Some(url) = config.url.clone() else {
                bail!("[status] kind = \"http\" needs a url");
            };
            Arc::new(
                HttpStatus::new(url, token, Duration::from_secs(config.timeout_secs))
                    .context("failed to build status client")?,
            )
        }
    })
}

pub fn display(settings: &Settings) -> Arc<dyn FrameDisplay> {
    if settings.display.enabled {
        Arc::new(FileFrameDisplay::new(&settings.display))
    } else {
        Arc::new(LogDisplay)
    }
}

pub fn collaborators(settings: &Settings, secrets: Secrets) -> Result<Collaborators> {
    let mut llm = settings.llm.clone();
    llm.api_key = secrets.api_key;

    Ok(Collaborators {
        generator: Arc::new(
            MessagesGenerator::new(&llm).context("failed to set up sketch generator")?,
        ),
        judge: Arc::new(MessagesJudge::new(&llm).context("failed to set up judge")?),
        display: display(settings),
        publisher: Arc::new(GitGallery::new(&settings.gallery)),
        ledger: Arc::new(FileLedger::new(&settings.ledger.path)),
        status: status_sink(settings, secrets.status_token)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_reported() {
        let err = collaborators(&Settings::default(), Secrets::default())
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("EASEL_API_KEY"));
    }

    #[test]
    fn test_collaborators_with_key() {
        let secrets = Secrets {
            api_key: Some("k".to_string()),
            status_token: None,
        };
        assert!(collaborators(&Settings::default(), secrets).is_ok());
    }

    #[test]
    fn test_http_status_needs_url() {
        let mut settings = Settings::default();
        settings.status.kind = StatusKind::Http;
        assert!(status_sink(&settings, None).is_err());
        settings.status.url = Some("http://127.0.0.1:9/status.json".to_string());
        assert!(status_sink(&settings, None).is_ok());
    }
}
