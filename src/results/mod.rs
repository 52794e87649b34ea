//! Result sets, rows and the per-execution query outcome.

pub mod outcome;
pub mod result_set;
pub mod row;

pub use outcome::QueryOutcome;
pub use result_set::ResultSet;
pub use row::Row;
