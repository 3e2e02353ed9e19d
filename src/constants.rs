/// Smallest valid lotto number.
pub const NUMBER_MIN: u8 = 1;

/// Largest valid lotto number.
pub const NUMBER_MAX: u8 = 45;

/// Numbers drawn per round (excluding the bonus).
pub const PICK_COUNT: usize = 6;

/// Prize tiers published per round (ranks 1..=5).
pub const PRIZE_TIER_COUNT: usize = 5;

/// Default lookback window for frequency recommendations, in rounds.
pub const DEFAULT_RECOMMEND_WINDOW: u32 = 52;

/// Upper bound on the recommendation lookback window.
pub const MAX_RECOMMEND_WINDOW: u32 = 1_000;

/// Draw-date format as published on the result page, e.g. "2024년 01월 06일".
pub const SOURCE_DATE_FORMAT: &str = "%Y년 %m월 %d일";
