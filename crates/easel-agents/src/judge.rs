//! Batch judging over the messages API.

use async_trait::async_trait;
use easel_core::{JudgingError, SketchJudge, Submission};

use crate::config::LlmConfig;
use crate::error::AgentResult;
use crate::messages::{CallOptions, ContentBlock, MessagesClient};

/// Instruction block sent ahead of the images.
pub fn judging_instructions(history: &str) -> String {
    format!(
        "Evaluate these generative artworks based on learned preferences:\n\n\
         {history}\n\n\
         For each image:\n\
         1. Score 0-10 (write it as N/10)\n\
         2. What works aesthetically\n\
         3. What doesn't work\n\n\
         Then select the BEST ONE by its id and explain your reasoning. \
         Put the id of your final choice in your last paragraph."
    )
}

/// All content blocks for one judging request: instructions, then each
/// image followed by its caption.
pub fn judging_content(submissions: &[Submission], history: &str) -> Vec<ContentBlock> {
    let mut content = Vec::with_capacity(1 + submissions.len() * 2);
    content.push(ContentBlock::text(judging_instructions(history)));
    for submission in submissions {
        content.push(ContentBlock::png(&submission.image));
        content.push(ContentBlock::text(format!(
            "SKETCH {}: {}",
            submission.id, submission.theme
        )));
    }
    content
}

/// [`SketchJudge`] backed by [`MessagesClient`].
#[derive(Debug, Clone)]
pub struct MessagesJudge {
    client: MessagesClient,
    model: String,
    max_tokens: u32,
}

impl MessagesJudge {
    pub fn new(config: &LlmConfig) -> AgentResult<Self> {
        Ok(Self {
            client: MessagesClient::new(config)?,
            model: config.judge_model.clone(),
            max_tokens: config.judge_max_tokens,
        })
    }
}

#[async_trait]
impl SketchJudge for MessagesJudge {
    async fn judge(
        &self,
        submissions: &[Submission],
        history: &str,
    ) -> Result<String, JudgingError> {
        let content = judging_content(submissions, history);
        let options = CallOptions {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: None,
            temperature: None,
        };
        self.client
            .complete(options, &content)
            .await
            .map_err(|e| JudgingError::Request(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ContentBlock;

    #[test]
    fn test_content_interleaves_images_and_captions() {
        let submissions = vec![
            Submission {
                id: "sketch_000".to_string(),
                theme: "grid".to_string(),
                image: vec![0x89, 0x50],
            },
            Submission {
                id: "sketch_003".to_string(),
                theme: "spiral".to_string(),
                image: vec![0x89, 0x50],
            },
        ];
        let content = judging_content(&submissions, "history text");

        assert_eq!(content.len(), 5);
        match &content[0] {
            ContentBlock::Text { text } => assert!(text.contains("history text")),
            other => panic!("expected text, got {other:?}"),
        }
        assert!(matches!(content[1], ContentBlock::Image { .. }));
        assert_eq!(content[4], ContentBlock::text("SKETCH sketch_003: spiral"));
    }
}
