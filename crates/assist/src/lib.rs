//! Text generation seam for recommendation explanations. The recommendation
//! service prompts a [`TextGenerator`]; callers plug in the OpenAI-compatible
//! client or a deterministic double.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

pub mod openai;

pub use openai::OpenAiGenerator;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Always answers with a fixed string and records the prompts it saw.
#[derive(Default)]
pub struct StaticGenerator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl StaticGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("static generator lock").clone()
    }
}

#[async_trait]
impl TextGenerator for StaticGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().expect("static generator lock").push(prompt.to_owned());
        Ok(self.reply.clone())
    }
}

/// Always fails; callers are expected to fall back to canned copy.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("text generation unavailable")
    }
}
