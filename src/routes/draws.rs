use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::ingest::IngestionController;
use crate::response::{ok, AppError};
use crate::state::AppState;

/// Largest round span a single range query may ask for.
const MAX_RANGE_SPAN: u32 = 520;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_draws))
        .route("/latest", get(latest_draw))
        .route("/ingest", post(trigger_ingest))
        .route("/backfill", post(trigger_backfill))
        .route("/:round", get(get_draw))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start: u32,
    end: u32,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LatestQuery {
    /// "round" (default) or "date".
    by: Option<String>,
}

async fn list_draws(
    Query(query): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if query.start == 0 || query.end < query.start {
        return Err(AppError::bad_request(
            "INVALID_RANGE",
            "start must be >= 1 and end >= start",
        ));
    }
    if query.end - query.start + 1 > MAX_RANGE_SPAN {
        return Err(AppError::bad_request(
            "RANGE_TOO_WIDE",
            &format!("at most {} rounds per range query", MAX_RANGE_SPAN),
        ));
    }

    let draws = state.store().draws_between(query.start, query.end)?;
    Ok(ok(draws))
}

async fn latest_draw(
    Query(query): Query<LatestQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let draw = match query.by.as_deref() {
        None | Some("round") => state.store().latest_draw_by_round()?,
        Some("date") => state.store().latest_draw_by_date()?,
        Some(other) => {
            return Err(AppError::bad_request(
                "INVALID_QUERY",
                &format!("unknown latest-by selector '{}'", other),
            ))
        }
    };

    let draw = draw.ok_or_else(|| AppError::not_found("No draw results ingested yet"))?;
    Ok(ok(draw))
}

async fn get_draw(
    Path(round): Path<u32>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let draw = state
        .store()
        .get_draw(round)?
        .ok_or_else(|| AppError::not_found(&format!("Round {} not found", round)))?;
    Ok(ok(draw))
}

/// Operator-facing manual trigger. Runs exactly the same
/// `ingest_latest_if_needed` path as the scheduled job and acknowledges
/// with the before/after advance report — never with partial draw data.
async fn trigger_ingest(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let controller = IngestionController::new(state.store().clone(), state.source().clone());
    let result = controller.ingest_latest_if_needed().await?;
    Ok(ok(result))
}

async fn trigger_backfill(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let controller = IngestionController::new(state.store().clone(), state.source().clone());
    let report = controller.ingest_all_missing().await?;
    Ok(ok(report))
}
