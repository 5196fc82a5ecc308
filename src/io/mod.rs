/// CSV export of the four output tables.
pub mod export;
