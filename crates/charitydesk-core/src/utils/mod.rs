//! Utility functions for display formatting and string matching.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{contains_ignore_case, format_date, format_money, truncate};
