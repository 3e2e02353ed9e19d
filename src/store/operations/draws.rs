use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{NUMBER_MAX, NUMBER_MIN, PICK_COUNT};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// One confirmed lottery round. Immutable once persisted: a bad ingestion is
/// rejected before commit, never patched afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub round: u32,
    pub draw_date: NaiveDate,
    pub numbers: [u8; 6],
    pub bonus_number: u8,
    pub first_prize_winner_count: u32,
    pub first_prize_amount: u64,
    pub total_sales_amount: u64,
    /// Ranks 1..=5. Owned by the parent draw and serialized inside its
    /// value, so draw and tiers commit as one atomic write.
    pub prize_tiers: Vec<PrizeTierDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrizeTierDetail {
    pub rank: u8,
    pub winner_count: u32,
    /// Amount paid per winner for this tier.
    pub amount: u64,
}

impl DrawResult {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.round == 0 {
            return Err(StoreError::Validation("round must be positive".into()));
        }
        let mut seen = HashSet::with_capacity(PICK_COUNT + 1);
        for n in self.numbers {
            if !(NUMBER_MIN..=NUMBER_MAX).contains(&n) {
                return Err(StoreError::Validation(format!(
                    "number {} out of range {}..={}",
                    n, NUMBER_MIN, NUMBER_MAX
                )));
            }
            if !seen.insert(n) {
                return Err(StoreError::Validation(format!("duplicate number {}", n)));
            }
        }
        if !(NUMBER_MIN..=NUMBER_MAX).contains(&self.bonus_number) {
            return Err(StoreError::Validation(format!(
                "bonus number {} out of range",
                self.bonus_number
            )));
        }
        if seen.contains(&self.bonus_number) {
            return Err(StoreError::Validation(format!(
                "bonus number {} duplicates a primary number",
                self.bonus_number
            )));
        }
        Ok(())
    }

    /// The six winning numbers as a set, for match counting.
    pub fn winning_set(&self) -> HashSet<u8> {
        self.numbers.iter().copied().collect()
    }

    /// Per-winner amount for a prize rank, if the tier row was published.
    pub fn tier_amount(&self, rank: u8) -> Option<u64> {
        self.prize_tiers
            .iter()
            .find(|t| t.rank == rank)
            .map(|t| t.amount)
    }
}

impl Store {
    /// Persist one round. Rejects duplicates with `Conflict`; the caller
    /// treats that as "already ingested", not an error.
    pub fn insert_draw(&self, draw: &DrawResult) -> Result<(), StoreError> {
        draw.validate()?;

        let key = keys::draw_key(draw.round);
        let bytes = Self::serialize(draw)?;

        // compare_and_swap on absence keeps the at-most-one-per-round
        // invariant even if two writers race past an exists() check.
        let swapped = self
            .draws
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(bytes))?;
        if swapped.is_err() {
            return Err(StoreError::Conflict {
                entity: "draw".into(),
                key,
            });
        }

        // Secondary index, rebuildable from primary data via migration.
        let index_key = keys::draw_date_index_key(draw.draw_date, draw.round);
        self.draws_by_date
            .insert(index_key.as_bytes(), key.as_bytes())?;
        Ok(())
    }

    pub fn draw_exists(&self, round: u32) -> Result<bool, StoreError> {
        Ok(self.draws.contains_key(keys::draw_key(round).as_bytes())?)
    }

    pub fn get_draw(&self, round: u32) -> Result<Option<DrawResult>, StoreError> {
        match self.draws.get(keys::draw_key(round).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Highest round in the store, independent of draw dates.
    pub fn latest_draw_by_round(&self) -> Result<Option<DrawResult>, StoreError> {
        match self.draws.last()? {
            Some((_, raw)) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Most recently dated draw. May disagree with `latest_draw_by_round`
    /// while a backfill inserts older rounds after newer ones.
    pub fn latest_draw_by_date(&self) -> Result<Option<DrawResult>, StoreError> {
        match self.draws_by_date.last()? {
            Some((_, round_key)) => {
                let round = keys::parse_draw_key(&round_key).ok_or_else(|| {
                    StoreError::Validation("corrupt draws_by_date index value".into())
                })?;
                self.get_draw(round)
            }
            None => Ok(None),
        }
    }

    /// Draws with `start <= round <= end`, ascending by round.
    pub fn draws_between(&self, start: u32, end: u32) -> Result<Vec<DrawResult>, StoreError> {
        let lo = keys::draw_key(start);
        let hi = keys::draw_key(end);
        let mut out = Vec::new();
        for item in self.draws.range(lo.as_bytes()..=hi.as_bytes()) {
            let (_, raw) = item?;
            out.push(Self::deserialize::<DrawResult>(&raw)?);
        }
        Ok(out)
    }

    /// Occurrence count per number across all rounds >= `since_round`,
    /// over the six primary slots (plus the bonus slot when requested).
    /// Returns only numbers that occurred, ordered by number ascending;
    /// ranking is the caller's job.
    pub fn number_frequency(
        &self,
        since_round: u32,
        include_bonus: bool,
    ) -> Result<Vec<(u8, u32)>, StoreError> {
        let lo = keys::draw_key(since_round);
        let mut counts = [0u32; (NUMBER_MAX as usize) + 1];

        for item in self.draws.range(lo.as_bytes()..) {
            let (_, raw) = item?;
            let draw: DrawResult = Self::deserialize(&raw)?;
            for n in draw.numbers {
                counts[n as usize] += 1;
            }
            if include_bonus {
                counts[draw.bonus_number as usize] += 1;
            }
        }

        Ok(counts
            .iter()
            .enumerate()
            .skip(NUMBER_MIN as usize)
            .filter(|(_, c)| **c > 0)
            .map(|(n, c)| (n as u8, *c))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample_draw(round: u32, numbers: [u8; 6], bonus: u8) -> DrawResult {
        DrawResult {
            round,
            draw_date: NaiveDate::from_ymd_opt(2024, 1, 6)
                .unwrap()
                .checked_add_days(chrono::Days::new(7 * round as u64))
                .unwrap(),
            numbers,
            bonus_number: bonus,
            first_prize_winner_count: 12,
            first_prize_amount: 2_000_000_000,
            total_sales_amount: 100_000_000_000,
            prize_tiers: vec![
                PrizeTierDetail {
                    rank: 1,
                    winner_count: 12,
                    amount: 2_000_000_000,
                },
                PrizeTierDetail {
                    rank: 2,
                    winner_count: 80,
                    amount: 50_000_000,
                },
                PrizeTierDetail {
                    rank: 3,
                    winner_count: 3_000,
                    amount: 1_500_000,
                },
                PrizeTierDetail {
                    rank: 4,
                    winner_count: 140_000,
                    amount: 50_000,
                },
                PrizeTierDetail {
                    rank: 5,
                    winner_count: 2_400_000,
                    amount: 5_000,
                },
            ],
        }
    }

    fn open_store(dir: &tempfile::TempDir) -> Store {
        Store::open(dir.path().join("db").to_str().unwrap()).unwrap()
    }

    #[test]
    fn duplicate_round_is_a_conflict() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let draw = sample_draw(100, [3, 12, 19, 27, 34, 41], 7);

        store.insert_draw(&draw).unwrap();
        let err = store.insert_draw(&draw).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.draws_between(100, 100).unwrap().len(), 1);
    }

    #[test]
    fn rejects_out_of_range_and_duplicate_numbers() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let bad_range = sample_draw(1, [0, 2, 3, 4, 5, 6], 7);
        assert!(matches!(
            store.insert_draw(&bad_range),
            Err(StoreError::Validation(_))
        ));

        let dup = sample_draw(1, [2, 2, 3, 4, 5, 6], 7);
        assert!(matches!(
            store.insert_draw(&dup),
            Err(StoreError::Validation(_))
        ));

        let bonus_dup = sample_draw(1, [1, 2, 3, 4, 5, 6], 6);
        assert!(matches!(
            store.insert_draw(&bonus_dup),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn latest_by_round_and_by_date_can_disagree() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let mut newer_round = sample_draw(10, [1, 2, 3, 4, 5, 6], 7);
        newer_round.draw_date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        store.insert_draw(&newer_round).unwrap();

        // A lower round lands afterwards carrying a later publication date.
        let mut later_dated = sample_draw(5, [7, 8, 9, 10, 11, 12], 13);
        later_dated.draw_date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        store.insert_draw(&later_dated).unwrap();

        // The two queries diverge, and each stays independently correct.
        assert_eq!(store.latest_draw_by_round().unwrap().unwrap().round, 10);
        assert_eq!(store.latest_draw_by_date().unwrap().unwrap().round, 5);

        assert!(store.draw_exists(5).unwrap());
        assert_eq!(store.draws_between(1, 20).unwrap().len(), 2);
    }

    #[test]
    fn range_is_ascending_and_inclusive() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        for round in [3u32, 1, 2] {
            store
                .insert_draw(&sample_draw(round, [1, 2, 3, 4, 5, 6], 7))
                .unwrap();
        }

        let rounds: Vec<u32> = store
            .draws_between(1, 3)
            .unwrap()
            .iter()
            .map(|d| d.round)
            .collect();
        assert_eq!(rounds, vec![1, 2, 3]);
    }

    #[test]
    fn frequency_counts_window_and_bonus_flag() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        store
            .insert_draw(&sample_draw(1, [1, 2, 3, 4, 5, 6], 7))
            .unwrap();
        store
            .insert_draw(&sample_draw(2, [1, 2, 3, 4, 5, 8], 7))
            .unwrap();

        let freq = store.number_frequency(1, false).unwrap();
        assert!(freq.contains(&(1, 2)));
        assert!(freq.contains(&(6, 1)));
        // Bonus excluded: 7 never appears.
        assert!(!freq.iter().any(|(n, _)| *n == 7));

        let with_bonus = store.number_frequency(1, true).unwrap();
        assert!(with_bonus.contains(&(7, 2)));

        // Window restricted to round 2.
        let windowed = store.number_frequency(2, false).unwrap();
        assert!(windowed.contains(&(8, 1)));
        assert!(!windowed.iter().any(|(n, _)| *n == 6));

        // Ordered by number ascending.
        let numbers: Vec<u8> = freq.iter().map(|(n, _)| *n).collect();
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        assert_eq!(numbers, sorted);
    }

    #[test]
    fn tier_amount_lookup() {
        let draw = sample_draw(1, [1, 2, 3, 4, 5, 6], 7);
        assert_eq!(draw.tier_amount(1), Some(2_000_000_000));
        assert_eq!(draw.tier_amount(5), Some(5_000));
        assert_eq!(draw.tier_amount(0), None);
    }
}
