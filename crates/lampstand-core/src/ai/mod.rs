pub mod gemini;

use async_trait::async_trait;

pub use gemini::GeminiClient;

/// A text-generation backend: one prompt in, one block of text out.
#[async_trait]
pub trait CommentaryGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
