//! Log checks for a finished listrev test session.

pub mod check;
pub mod parse;
pub mod summary;

pub use check::{Expectations, Failure, check_summary};
pub use parse::scrape_logs;
pub use summary::RunSummary;
