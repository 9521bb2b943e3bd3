//! Sketch generation over the messages API.

use async_trait::async_trait;
use easel_core::{GenerationError, GenerationRequest, SketchGenerator};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::AgentResult;
use crate::messages::{CallOptions, ContentBlock, MessagesClient};

/// System prompt describing the sandbox the program will run in.
pub const SKETCH_SYSTEM_PROMPT: &str = r#"You write generative 2D art programs in the Rhai scripting language.

REQUIRED STRUCTURE:
```rhai
let surface = new_surface(600, 480);

// Background
surface.set_source_rgb(0.0, 0.0, 0.0);
surface.paint();

// YOUR GENERATIVE CODE HERE
```

AVAILABLE FUNCTIONS (nothing else exists, there is no import, file or network access):
- new_surface(width, height), surface.width, surface.height
- surface.set_source_rgb(r, g, b), surface.set_source_rgba(r, g, b, a)  // 0.0 to 1.0
- surface.set_line_width(w), surface.paint()
- surface.new_path(), surface.move_to(x, y), surface.line_to(x, y)
- surface.curve_to(x1, y1, x2, y2, x3, y3), surface.close_path()
- surface.rectangle(x, y, w, h), surface.arc(xc, yc, r, angle1, angle2)
- surface.fill(), surface.stroke()
- sin, cos, tan, asin, acos, atan, sqrt, exp, ln, log, floor, ceiling, round, PI(), E()
- to_int(x), to_float(x)
- rand() in [0, 1), rand_float(lo, hi), rand_int(lo, hi) (inclusive)

The drawing MUST be left in a variable named `surface`. Programs stop after
a few seconds, so avoid unbounded loops.

AESTHETIC GUIDELINES:
- Swiss design principles: grids, precision, hierarchy
- High contrast, often black and white with minimal color
- Geometric systems and parametric patterns
- Systematic repetition with variation
- Multiple overlapping layers with transparency
- Mathematical relationships (fibonacci, golden ratio, harmonics)
- Interplay between systematic order and controlled randomness
- Strategic use of negative space

Avoid plain concentric circles, uniform grids, and a single shape repeated
identically. Each sketch should explore a unique concept."#;

/// Compose the user prompt for one slot.
pub fn generation_prompt(theme: &str, brief: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(brief) = brief.filter(|b| !b.trim().is_empty()) {
        prompt.push_str("VISUAL INSPIRATION BRIEF:\n");
        prompt.push_str(brief.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Create: {theme}\nMake it visually striking, mathematically sophisticated, and systematic. \
         Reply with a single ```rhai code block."
    ));
    prompt
}

/// [`SketchGenerator`] backed by [`MessagesClient`].
#[derive(Debug, Clone)]
pub struct MessagesGenerator {
    client: MessagesClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
    brief: Option<String>,
}

impl MessagesGenerator {
    pub fn new(config: &LlmConfig) -> AgentResult<Self> {
        Ok(Self {
            client: MessagesClient::new(config)?,
            model: config.generator_model.clone(),
            max_tokens: config.generator_max_tokens,
            temperature: config.temperature,
            brief: config.brief.clone(),
        })
    }
}

#[async_trait]
impl SketchGenerator for MessagesGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let content = [ContentBlock::text(generation_prompt(
            &request.theme,
            self.brief.as_deref(),
        ))];
        let options = CallOptions {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: Some(SKETCH_SYSTEM_PROMPT),
            temperature: Some(self.temperature),
        };

        let text = self
            .client
            .complete(options, &content)
            .await
            .map_err(|e| GenerationError::Request {
                candidate_id: request.candidate_id.clone(),
                reason: e.to_string(),
            })?;
        debug!(candidate_id = %request.candidate_id, chars = text.len(), "generated");
        Ok(text)
    }
}
