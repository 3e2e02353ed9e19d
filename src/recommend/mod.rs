use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::constants::{MAX_RECOMMEND_WINDOW, NUMBER_MAX, NUMBER_MIN, PICK_COUNT};
use crate::store::{Store, StoreError};

/// Mines historical draws over a bounded lookback window and ranks numbers
/// by how often they were drawn.
pub struct FrequencyAnalyzer {
    store: Arc<Store>,
}

#[derive(Debug, Error)]
pub enum RecommendError {
    /// No draw has ever been ingested; an empty result is surfaced
    /// explicitly instead of fabricating a recommendation.
    #[error("no draw results available")]
    NoDraws,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Ephemeral query projection, never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FrequencySample {
    pub number: u8,
    pub count: u32,
    /// 1-based position in the frequency ordering.
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Exactly six distinct in-range numbers, ascending.
    pub numbers: Vec<u8>,
    pub window: u32,
    pub range_start: u32,
    pub range_end: u32,
    /// Supporting counts for the recommended numbers, frequency order.
    pub samples: Vec<FrequencySample>,
}

impl FrequencyAnalyzer {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Recommend six numbers from the last `window` rounds: count descending,
    /// ties broken by number ascending, presented ascending. Deterministic
    /// for a fixed store state.
    pub fn recommend(&self, window: u32) -> Result<Recommendation, RecommendError> {
        let window = window.clamp(1, MAX_RECOMMEND_WINDOW);

        let latest = self
            .store
            .latest_draw_by_round()?
            .ok_or(RecommendError::NoDraws)?
            .round;
        let range_start = latest.saturating_sub(window - 1).max(1);

        let mut frequency = self.store.number_frequency(range_start, false)?;
        // Count descending, then number ascending for determinism.
        frequency.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut samples: Vec<FrequencySample> = frequency
            .iter()
            .take(PICK_COUNT)
            .enumerate()
            .map(|(i, (number, count))| FrequencySample {
                number: *number,
                count: *count,
                rank: (i + 1) as u32,
            })
            .collect();

        // A short window can surface fewer than six distinct numbers; pad
        // with the smallest unused numbers to keep the output fixed-size.
        let mut candidate = NUMBER_MIN;
        while samples.len() < PICK_COUNT && candidate <= NUMBER_MAX {
            if !samples.iter().any(|s| s.number == candidate) {
                samples.push(FrequencySample {
                    number: candidate,
                    count: 0,
                    rank: (samples.len() + 1) as u32,
                });
            }
            candidate += 1;
        }

        let mut numbers: Vec<u8> = samples.iter().map(|s| s.number).collect();
        numbers.sort_unstable();

        Ok(Recommendation {
            numbers,
            window,
            range_start,
            range_end: latest,
            samples,
        })
    }
}
