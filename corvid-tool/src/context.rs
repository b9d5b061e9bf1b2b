//! Per-call execution context: cancellation and deadline.
//!
//! Timeouts, cancellation, and deadlines are expressed entirely
//! through this type rather than through per-tool parameters (§4.1).

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Cancellation + deadline handed to every tool invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    cancel: CancellationToken,
    deadline: Option<Duration>,
}

impl ToolContext {
    /// A context with no deadline, cancellable via the given token.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Attach a deadline (relative, applied from the moment the call
    /// starts).
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A background context: never cancelled, no deadline. Useful for
    /// tests and for callers that don't need cancellation.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Whether cancellation has already been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The configured deadline, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// A future that resolves when cancellation is requested — for
    /// `tokio::select!` against long-running I/O.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Underlying token, for forwarding into spawned subprocesses.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_never_cancels() {
        let ctx = ToolContext::background();
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_propagates() {
        let token = CancellationToken::new();
        let ctx = ToolContext::new(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
