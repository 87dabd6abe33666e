//! Retrieval collaborator boundary.

use async_trait::async_trait;

/// Error from a retrieval collaborator.
#[derive(Debug, thiserror::Error)]
#[error("retrieval failed: {0}")]
pub struct RetrievalError(pub String);

/// Produces a context-augmented prompt for a request.
///
/// Implementations own all retrieval concerns (embedding, search, ranking).
/// The returned prompt must contain [`crate::prompts::USER_REQUEST_MARKER`]
/// so the engine can splice conversational memory in front of the final
/// request.
#[async_trait]
pub trait RetrievalAugmenter: Send + Sync {
    async fn augment(
        &self,
        message: &str,
        system_prompt: &str,
    ) -> Result<String, RetrievalError>;
}
