use chrono::NaiveDate;

/// Zero-padded so lexicographic key order equals numeric round order.
pub fn draw_key(round: u32) -> String {
    format!("{:010}", round)
}

pub fn parse_draw_key(key: &[u8]) -> Option<u32> {
    std::str::from_utf8(key).ok()?.parse::<u32>().ok()
}

/// Secondary index key: date first, round as tiebreaker. The last entry in
/// key order is the most recently *dated* draw, which may differ from the
/// highest round while a backfill is filling older gaps.
pub fn draw_date_index_key(date: NaiveDate, round: u32) -> String {
    format!("{}:{:010}", date.format("%Y-%m-%d"), round)
}

pub fn ticket_key(round: u32, ticket_id: &str) -> String {
    format!("{:010}:{}", round, ticket_id)
}

pub fn ticket_round_prefix(round: u32) -> String {
    format!("{:010}:", round)
}
