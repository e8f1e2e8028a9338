//! AI query collaborator.
//!
//! The executor treats the model as an opaque text-in/text-out function.
//! Provider plumbing (HTTP clients, local inference) lives with the host
//! application, which plugs it in through [`AiProvider`].

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by an [`AiProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// No provider was configured for this executor.
    #[error("no AI provider is configured")]
    NotConfigured,

    /// The provider answered with an error.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Answers a single natural-language query.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn ask(&self, query: &str) -> Result<String, AiError>;
}

/// Provider used when the host application did not supply one.
/// Every query fails with [`AiError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredAiProvider;

#[async_trait]
impl AiProvider for UnconfiguredAiProvider {
    async fn ask(&self, _query: &str) -> Result<String, AiError> {
        Err(AiError::NotConfigured)
    }
}
