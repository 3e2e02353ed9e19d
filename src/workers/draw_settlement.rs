use std::sync::Arc;

use crate::ingest::IngestionController;
use crate::reconcile::{ReconcileError, ReconciliationEngine};
use crate::source::DrawSource;
use crate::store::Store;

/// Offset settlement firing: re-attempt ingestion of the latest round, then
/// reconcile the newest committed round if it still has unclaimed tickets.
/// Runs strictly after the draw is durable, so reconciliation never sees a
/// half-written round.
pub async fn run(store: &Arc<Store>, source: Arc<dyn DrawSource>) {
    tracing::info!("Draw settlement worker running");

    let controller = IngestionController::new(store.clone(), source);
    match controller.ingest_latest_if_needed().await {
        Ok(result) if result.advanced => {
            tracing::info!(round = result.expected, "Round ingested on settlement pass");
        }
        Ok(result) => {
            tracing::debug!(
                expected = result.expected,
                outcome = ?result.outcome,
                "No new round on settlement pass"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Settlement-pass ingestion failed on store access");
            return;
        }
    }

    let latest = match store.latest_draw_by_round() {
        Ok(Some(draw)) => draw.round,
        Ok(None) => {
            tracing::info!("No draws ingested yet; nothing to settle");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to query latest round");
            return;
        }
    };

    match store.has_unclaimed_tickets(latest) {
        Ok(false) => {
            tracing::debug!(round = latest, "No unclaimed tickets for latest round");
            return;
        }
        Ok(true) => {}
        Err(e) => {
            tracing::error!(error = %e, round = latest, "Failed to scan tickets");
            return;
        }
    }

    let engine = ReconciliationEngine::new(store.clone());
    match engine.reconcile(latest) {
        Ok(report) => {
            tracing::info!(
                round = report.round,
                settled = report.settled,
                winners = report.winners,
                "Settlement complete"
            );
        }
        // Retried on the next cycle; the scheduler itself never crashes.
        Err(ReconcileError::DrawNotIngested(round)) => {
            tracing::error!(round, "Reconciliation precondition failed");
        }
        Err(e) => {
            tracing::error!(error = %e, round = latest, "Settlement failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::source::canned::{generated_draw, CannedDrawSource};
    use crate::store::operations::tickets::TicketEntry;

    use super::*;

    #[tokio::test]
    async fn settlement_pass_ingests_then_reconciles() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db").to_str().unwrap()).unwrap());
        let source = Arc::new(CannedDrawSource::with_rounds(1));

        let draw = generated_draw(1);
        let winning = draw
            .numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",");
        store
            .create_ticket(&TicketEntry::new("u1", 1, &winning, false))
            .unwrap();

        run(&store, source).await;

        assert!(store.draw_exists(1).unwrap());
        let settled = store.tickets_for_round(1).unwrap();
        assert_eq!(settled.len(), 1);
        assert!(settled[0].claimed);
        assert_eq!(settled[0].rank, Some(1));
    }

    #[tokio::test]
    async fn settlement_with_empty_store_and_source_is_quiet() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db").to_str().unwrap()).unwrap());
        run(&store, Arc::new(CannedDrawSource::new())).await;
        assert!(store.latest_draw_by_round().unwrap().is_none());
    }

    #[tokio::test]
    async fn already_settled_round_is_not_reprocessed() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db").to_str().unwrap()).unwrap());
        let source = Arc::new(CannedDrawSource::with_rounds(1));
        store.insert_draw(&generated_draw(1)).unwrap();

        let mut ticket = TicketEntry::new("u1", 1, "1,2,3,4,5,6", false);
        ticket.claimed = true;
        ticket.rank = Some(0);
        ticket.winning_amount = Some(0);
        store.create_ticket(&ticket).unwrap();

        run(&store, source).await;

        let after = store.get_ticket(1, &ticket.id).unwrap().unwrap();
        assert_eq!(after, ticket);
    }
}
