use std::sync::Arc;

use proptest::prelude::*;

use lotto_backend::recommend::FrequencyAnalyzer;
use lotto_backend::reconcile::calculate_rank;
use lotto_backend::source::canned::generated_draw;
use lotto_backend::store::operations::tickets::TicketEntry;
use lotto_backend::store::Store;

proptest! {
    #[test]
    fn rank_is_always_in_prize_table(match_count in 0usize..=6, bonus in any::<bool>()) {
        let rank = calculate_rank(match_count, bonus);
        prop_assert!(rank <= 5);
        prop_assert_eq!(rank == 1, match_count == 6);
        prop_assert_eq!(rank == 2, match_count == 5 && bonus);
        prop_assert_eq!(rank == 0, match_count < 3);
    }

    #[test]
    fn ticket_selection_never_panics_and_stays_in_range(raw in ".{0,64}") {
        let ticket = TicketEntry::new("user", 1, &raw, false);
        let selection = ticket.selection();
        prop_assert!(selection.len() <= 6);
        prop_assert!(selection.iter().all(|n| (1..=45).contains(n)));
    }

}

proptest! {
    // Each case opens a fresh on-disk store; keep the case count small.
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn recommendation_shape_holds_for_any_history(rounds in 1u32..60, window in 1u32..200) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db").to_str().unwrap()).unwrap());
        for round in 1..=rounds {
            store.insert_draw(&generated_draw(round)).unwrap();
        }

        let rec = FrequencyAnalyzer::new(store).recommend(window).unwrap();

        prop_assert_eq!(rec.numbers.len(), 6);
        prop_assert!(rec.numbers.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(rec.numbers.iter().all(|n| (1..=45).contains(n)));
        prop_assert!(rec.range_start >= 1);
        prop_assert_eq!(rec.range_end, rounds);
        prop_assert!(rec.range_start <= rec.range_end);
    }
}
