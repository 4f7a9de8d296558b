//! Content-generation boundary.
//!
//! The executor hands kind-specific parameters across this trait and gets
//! an opaque payload string back. Generation failures surface as task
//! failures, never as engine crashes. The real system puts an LLM behind
//! this seam; `TemplateGenerator` renders deterministic payloads so the
//! engine is fully usable (and testable) without one.

use async_trait::async_trait;

use crate::domain::TaskParameters;
use crate::error::{Result, SchedrError};

/// Generates the payload delivered when a task fires.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, params: &TaskParameters) -> Result<String>;
}

/// Deterministic template-based generator.
///
/// Handles the content-bearing kinds (summary, learning); reminder and
/// fetch tasks never route through content generation.
#[derive(Debug, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    async fn generate(&self, params: &TaskParameters) -> Result<String> {
        match params {
            TaskParameters::Summary {
                target,
                source,
                format,
            } => {
                let mut content = match format.as_deref() {
                    Some("detailed") => format!("Here is a detailed summary about {}.", target),
                    _ => format!("Here is a short summary about {}.", target),
                };
                if let Some(source) = source {
                    content.push_str(&format!("\nSource: {}", source));
                }
                Ok(content)
            }
            TaskParameters::Learning {
                topic,
                difficulty,
                sources,
            } => {
                let level = if difficulty.is_empty() {
                    "beginner"
                } else {
                    difficulty.as_str()
                };
                let mut content = format!(
                    "Today's {} lesson: {}\n\
                     1. What it is and why it matters\n\
                     2. The key ideas to remember\n\
                     3. A real-world example\n\
                     4. A question to think about",
                    level, topic
                );
                if !sources.is_empty() {
                    content.push_str("\n\nWant to learn more? Check out these resources:\n");
                    for source in sources {
                        content.push_str(&format!("- {}: {}\n", source.name, source.url));
                    }
                }
                Ok(content)
            }
            other => Err(SchedrError::Content(format!(
                "unsupported content kind: {}",
                other.kind()
            ))),
        }
    }
}
