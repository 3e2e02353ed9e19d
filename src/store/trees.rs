pub const DRAWS: &str = "draws";
pub const DRAWS_BY_DATE: &str = "draws_by_date";
pub const TICKETS: &str = "tickets";
pub const SCHEMA_META: &str = "schema_meta";
