//! Pacing strategies applied between embedding calls during an index build.
//!
//! Embedding backends enforce rate limits, so the engine awaits a [`Pacer`]
//! before every embedding call except the first of a build.

use std::time::Duration;

use async_trait::async_trait;

/// Decides how long to wait before the next embedding call.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait before embedding chunk `next_chunk_id`.
    ///
    /// Not called for the first chunk of a build. Ids keep counting across
    /// rebuilds, so a rebuild starting at id 5 pauses before 6, 7 and so on.
    async fn pause(&self, next_chunk_id: usize);
}

/// Waits a fixed duration between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a pacer sleeping `delay` between consecutive calls.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self, _next_chunk_id: usize) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Issues calls back to back. Intended for local providers and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self, _next_chunk_id: usize) {}
}
