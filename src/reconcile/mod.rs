use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::store::{Store, StoreError};

/// Settles every outstanding ticket for a confirmed round. Only runs against
/// rounds whose draw result is durably committed; anything else is a caller
/// contract violation surfaced as `DrawNotIngested`.
pub struct ReconciliationEngine {
    store: Arc<Store>,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reconciliation was invoked for a round with no confirmed draw.
    #[error("draw result for round {0} is not ingested")]
    DrawNotIngested(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub round: u32,
    pub settled: u32,
    pub winners: u32,
}

/// Prize rank for a ticket: match count over the six primary numbers, with
/// the bonus breaking the 5-match tie. 0 means no prize.
pub fn calculate_rank(match_count: usize, bonus_match: bool) -> u8 {
    match (match_count, bonus_match) {
        (6, _) => 1,
        (5, true) => 2,
        (5, false) => 3,
        (4, _) => 4,
        (3, _) => 5,
        _ => 0,
    }
}

impl ReconciliationEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Settle all unclaimed tickets for `round` in one batch. Idempotent on
    /// re-run: claimed tickets are excluded from the input set.
    pub fn reconcile(&self, round: u32) -> Result<ReconcileReport, ReconcileError> {
        let draw = self
            .store
            .get_draw(round)?
            .ok_or(ReconcileError::DrawNotIngested(round))?;

        let winning = draw.winning_set();
        let bonus = draw.bonus_number;

        let mut outstanding = self.store.unclaimed_tickets_for_round(round)?;
        if outstanding.is_empty() {
            tracing::info!(round, "No outstanding tickets to reconcile");
            return Ok(ReconcileReport {
                round,
                settled: 0,
                winners: 0,
            });
        }

        let mut winners = 0u32;
        for ticket in &mut outstanding {
            let selection = ticket.selection();
            let match_count = selection.intersection(&winning).count();
            let bonus_match = selection.contains(&bonus);
            let rank = calculate_rank(match_count, bonus_match);

            // Payout joined from the draw's own tier rows; a missing tier
            // degrades to zero rather than blocking settlement.
            let amount = if rank == 0 {
                0
            } else {
                draw.tier_amount(rank).unwrap_or(0)
            };

            if rank > 0 {
                winners += 1;
            }
            ticket.rank = Some(rank);
            ticket.winning_amount = Some(amount);
            ticket.claimed = true;
        }

        self.store.settle_tickets(&outstanding)?;

        let report = ReconcileReport {
            round,
            settled: outstanding.len() as u32,
            winners,
        };
        tracing::info!(
            round,
            settled = report.settled,
            winners = report.winners,
            "Reconciliation complete"
        );
        Ok(report)
    }
}
