//! The text-generator contract the reasoning loop is built against.

use crate::error::ProviderError;
use crate::message::Message;

/// Per-call generation knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    /// Sampling temperature, `[0, 2]`.
    pub temperature: f64,
    /// Maximum output tokens for this call.
    pub max_tokens: u32,
}

/// A text-generation backend: process-local model runtime or a remote
/// HTTP endpoint, the core does not care which.
///
/// Deliberately not object-safe (uses RPITIT) — the loop is generic
/// over one concrete `Provider` per agent rather than storing a trait
/// object, since a single agent never switches providers mid-task.
pub trait Provider: Send + Sync {
    /// Generate the next assistant message for the given transcript.
    fn generate(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> impl std::future::Future<Output = Result<String, ProviderError>> + Send;
}
