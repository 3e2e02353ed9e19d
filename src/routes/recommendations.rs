use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::constants::MAX_RECOMMEND_WINDOW;
use crate::recommend::FrequencyAnalyzer;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(recommend))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RecommendQuery {
    /// Lookback window in rounds; defaults from config.
    window: Option<u32>,
}

async fn recommend(
    Query(query): Query<RecommendQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let window = query
        .window
        .unwrap_or(state.config().recommend.default_window);
    if window == 0 || window > MAX_RECOMMEND_WINDOW {
        return Err(AppError::bad_request(
            "INVALID_WINDOW",
            &format!("window must be between 1 and {}", MAX_RECOMMEND_WINDOW),
        ));
    }

    let analyzer = FrequencyAnalyzer::new(state.store().clone());
    let recommendation = analyzer.recommend(window)?;
    Ok(ok(recommendation))
}
