pub mod canned;
pub mod html;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::operations::draws::DrawResult;

/// Capability interface over the external draw publisher. Concrete fetch
/// mechanics stay behind this seam so callers (and tests) never touch the
/// network directly.
#[async_trait]
pub trait DrawSource: Send + Sync {
    /// Most recent round the publisher has confirmed.
    async fn latest_round(&self) -> Result<u32, SourceError>;

    /// One round's full result. Never returns a partial draw: any missing
    /// or non-numeric required field is a `Parse` failure for that round.
    async fn fetch_round(&self, round: u32) -> Result<DrawResult, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// Page did not load, the expected marker was absent, or the bounded
    /// wait elapsed. Also covers "round not yet published".
    #[error("draw source unavailable: {reason}")]
    Unavailable { reason: String },

    /// Page loaded but a required field was missing or non-numeric.
    #[error("failed to parse draw page for round {round}: {field}")]
    Parse { round: u32, field: &'static str },
}

impl SourceError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}
