//! Collaborator implementations for the Easel studio.
//!
//! - [`MessagesGenerator`] / [`MessagesJudge`]: generation and judging over a
//!   messages-style LLM API
//! - [`GitGallery`]: publishes winners into a git-tracked gallery tree
//! - [`FileFrameDisplay`]: writes the current frame for a local display
//! - [`JsonStatusFile`] / [`HttpStatus`]: status sinks

pub mod config;
pub mod display;
pub mod error;
pub mod frame;
pub mod gallery;
pub mod generator;
pub mod judge;
pub mod messages;
pub mod status;

pub use config::{DisplayConfig, GalleryConfig, LlmConfig, StatusConfig, StatusKind};
pub use display::{FileFrameDisplay, LogDisplay};
pub use error::{AgentError, AgentResult};
pub use gallery::GitGallery;
pub use generator::MessagesGenerator;
pub use judge::MessagesJudge;
pub use messages::MessagesClient;
pub use status::{HttpStatus, JsonStatusFile};
