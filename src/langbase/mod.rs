//! Langbase Pipes client and the completion seam used by the advisor.

mod client;
mod types;


pub use client::LangbaseClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::LangbaseResult;

/// Text-in, text-out access to a completion model.
///
/// A failure is always an error value, never an empty completion, so callers
/// can tell an unavailable service apart from an unusable answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run a single completion for `prompt`.
    async fn complete(&self, prompt: &str) -> LangbaseResult<String>;
}
