//! File ingest: delimited tables into typed TLFB and visit rows.

pub mod csv;
pub mod dates;
pub mod tlfb;
pub mod visit;

pub use csv::RawTable;
pub use dates::{parse_amount, parse_date};
pub use tlfb::daily_records;
pub use visit::{VisitFormat, VisitTable, visit_records};
