use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::constants::{NUMBER_MAX, PICK_COUNT};
use crate::source::{DrawSource, SourceError};
use crate::store::operations::draws::{DrawResult, PrizeTierDetail};

/// In-memory draw source: the capability test double, also selectable at
/// runtime via `SOURCE_MOCK=true` for development without network access.
#[derive(Debug, Default)]
pub struct CannedDrawSource {
    draws: RwLock<BTreeMap<u32, DrawResult>>,
}

impl CannedDrawSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source pre-seeded with deterministic draws for rounds 1..=n.
    pub fn with_rounds(n: u32) -> Self {
        let source = Self::new();
        for round in 1..=n {
            source.put(generated_draw(round));
        }
        source
    }

    pub fn put(&self, draw: DrawResult) {
        self.draws
            .write()
            .expect("canned source lock poisoned")
            .insert(draw.round, draw);
    }

    pub fn remove(&self, round: u32) {
        self.draws
            .write()
            .expect("canned source lock poisoned")
            .remove(&round);
    }
}

#[async_trait]
impl DrawSource for CannedDrawSource {
    async fn latest_round(&self) -> Result<u32, SourceError> {
        self.draws
            .read()
            .expect("canned source lock poisoned")
            .keys()
            .next_back()
            .copied()
            .ok_or_else(|| SourceError::unavailable("no rounds published"))
    }

    async fn fetch_round(&self, round: u32) -> Result<DrawResult, SourceError> {
        self.draws
            .read()
            .expect("canned source lock poisoned")
            .get(&round)
            .cloned()
            .ok_or_else(|| {
                SourceError::unavailable(format!("round {} not yet published", round))
            })
    }
}

/// Deterministic, valid draw for a round: six spread-out numbers plus a
/// distinct bonus, all derived from the round value.
pub fn generated_draw(round: u32) -> DrawResult {
    let mut numbers = [0u8; PICK_COUNT];
    for (i, slot) in numbers.iter_mut().enumerate() {
        *slot = (((round as usize + i * 7) % NUMBER_MAX as usize) + 1) as u8;
    }
    numbers.sort_unstable();
    let mut bonus = ((round as usize * 11) % NUMBER_MAX as usize + 1) as u8;
    while numbers.contains(&bonus) {
        bonus = bonus % NUMBER_MAX + 1;
    }

    let base = NaiveDate::from_ymd_opt(2002, 12, 7).expect("valid epoch date");
    DrawResult {
        round,
        draw_date: base + chrono::Days::new(7 * (round as u64 - 1)),
        numbers,
        bonus_number: bonus,
        first_prize_winner_count: 10,
        first_prize_amount: 2_500_000_000,
        total_sales_amount: 110_000_000_000,
        prize_tiers: vec![
            PrizeTierDetail {
                rank: 1,
                winner_count: 10,
                amount: 2_500_000_000,
            },
            PrizeTierDetail {
                rank: 2,
                winner_count: 75,
                amount: 55_000_000,
            },
            PrizeTierDetail {
                rank: 3,
                winner_count: 2_900,
                amount: 1_450_000,
            },
            PrizeTierDetail {
                rank: 4,
                winner_count: 145_000,
                amount: 50_000,
            },
            PrizeTierDetail {
                rank: 5,
                winner_count: 2_350_000,
                amount: 5_000,
            },
        ],
    }
}
