//! LLM capability contract.
//!
//! The LLM service used for topic labeling and short-document
//! classification is external. Each call is independently failable and
//! may return unparseable output; callers treat both the same way.

use crate::error::ModelError;

/// Trait for LLM completion.
///
/// Implement this trait to provide LLM-backed classification and
/// labeling. The implementation handles API calls, rate limiting, and
/// retries; this crate never retries on its own.
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the given prompt.
    fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// A no-op LLM client for configurations without an LLM and for tests.
///
/// Always returns an error, so every classification attempt counts as a
/// per-document failure.
pub struct NoOpLlmClient;

impl LlmClient for NoOpLlmClient {
    fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::Llm("No LLM configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_client_errors() {
        let client = NoOpLlmClient;
        assert!(client.complete("prompt").is_err());
    }
}
