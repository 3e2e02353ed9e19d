pub mod draws;
pub mod tickets;
