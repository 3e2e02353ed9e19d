use std::sync::Arc;

use serde::Serialize;

use crate::source::{DrawSource, SourceError};
use crate::store::{Store, StoreError};

/// Coordinates round fetches against the store with strict idempotency and
/// ascending order. "Current latest" is always re-derived from a fresh store
/// query, never cached across invocations.
pub struct IngestionController {
    store: Arc<Store>,
    source: Arc<dyn DrawSource>,
}

/// Per-round outcome. Source-side failures are data here, not errors: they
/// abort only the round they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IngestOutcome {
    Inserted,
    AlreadyPresent,
    SourceUnavailable,
    ParseFailed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub source_latest: u32,
    pub ingested: u32,
    pub skipped: u32,
    pub failed_rounds: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestIngest {
    /// Latest stored round before the attempt (0 when the store is empty).
    pub before: u32,
    /// The round this attempt targeted: `before + 1`.
    pub expected: u32,
    pub outcome: IngestOutcome,
    /// Whether the store's latest round actually advanced to `expected`.
    /// Distinguishes "source not yet updated" from a silent failure.
    pub advanced: bool,
}

impl IngestionController {
    pub fn new(store: Arc<Store>, source: Arc<dyn DrawSource>) -> Self {
        Self { store, source }
    }

    /// Fetch and persist one round. A round that already exists is an
    /// info-level no-op; source failures are reported per round without
    /// failing the surrounding job.
    pub async fn ingest_round(&self, round: u32) -> Result<IngestOutcome, StoreError> {
        if self.store.draw_exists(round)? {
            tracing::info!(round, "Round already ingested, skipping");
            return Ok(IngestOutcome::AlreadyPresent);
        }

        let draw = match self.source.fetch_round(round).await {
            Ok(draw) => draw,
            Err(SourceError::Unavailable { reason }) => {
                tracing::warn!(round, %reason, "Draw source unavailable");
                return Ok(IngestOutcome::SourceUnavailable);
            }
            Err(err @ SourceError::Parse { .. }) => {
                tracing::error!(round, error = %err, "Draw page failed to parse");
                return Ok(IngestOutcome::ParseFailed);
            }
        };

        match self.store.insert_draw(&draw) {
            Ok(()) => {
                tracing::info!(
                    round,
                    draw_date = %draw.draw_date,
                    "Ingested draw result"
                );
                Ok(IngestOutcome::Inserted)
            }
            // Lost a race with a concurrent writer: same terminal state.
            Err(StoreError::Conflict { .. }) => {
                tracing::info!(round, "Round ingested concurrently, skipping");
                Ok(IngestOutcome::AlreadyPresent)
            }
            Err(StoreError::Validation(message)) => {
                tracing::error!(round, %message, "Fetched draw failed validation, not persisted");
                Ok(IngestOutcome::ParseFailed)
            }
            Err(other) => Err(other),
        }
    }

    /// Backfill every missing round from max(1, latest stored) up to the
    /// source's latest, strictly ascending. A round that permanently fails
    /// leaves a logged gap; it never aborts the rest of the walk.
    pub async fn ingest_all_missing(&self) -> Result<BackfillReport, StoreError> {
        let source_latest = match self.source.latest_round().await {
            Ok(latest) => latest,
            Err(err) => {
                tracing::warn!(error = %err, "Cannot determine source latest round");
                return Ok(BackfillReport {
                    source_latest: 0,
                    ingested: 0,
                    skipped: 0,
                    failed_rounds: Vec::new(),
                });
            }
        };

        let start = self
            .store
            .latest_draw_by_round()?
            .map(|d| d.round)
            .unwrap_or(0)
            .max(1);

        let mut report = BackfillReport {
            source_latest,
            ingested: 0,
            skipped: 0,
            failed_rounds: Vec::new(),
        };

        for round in start..=source_latest {
            match self.ingest_round(round).await? {
                IngestOutcome::Inserted => report.ingested += 1,
                IngestOutcome::AlreadyPresent => report.skipped += 1,
                IngestOutcome::SourceUnavailable | IngestOutcome::ParseFailed => {
                    report.failed_rounds.push(round);
                }
            }
        }

        tracing::info!(
            source_latest,
            ingested = report.ingested,
            skipped = report.skipped,
            failed = report.failed_rounds.len(),
            "Backfill complete"
        );
        Ok(report)
    }

    /// Attempt the next expected round and report, after the fact, whether
    /// the store's latest round actually advanced.
    pub async fn ingest_latest_if_needed(&self) -> Result<LatestIngest, StoreError> {
        let before = self
            .store
            .latest_draw_by_round()?
            .map(|d| d.round)
            .unwrap_or(0);
        let expected = before + 1;

        let outcome = self.ingest_round(expected).await?;

        let after = self
            .store
            .latest_draw_by_round()?
            .map(|d| d.round)
            .unwrap_or(0);

        Ok(LatestIngest {
            before,
            expected,
            outcome,
            advanced: after == expected,
        })
    }
}
