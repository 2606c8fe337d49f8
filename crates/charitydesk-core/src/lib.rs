//! Charitydesk core library.
//!
//! Backend for a small charity dashboard: donor, inventory and finance
//! records kept in a realtime document database.
//!
//! - `source`: the database (`RealtimeDbClient`) and an in-memory stand-in
//! - `cache`: time-bounded read-through cache with an injectable clock
//! - `directory`: the cached donor list
//! - `records`: inventory and finance reads plus validated writes
//! - `summary`: income and expense totals for a calendar month
//! - `dashboard`: wires the above together from a `Config`

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod models;
pub mod profile;
pub mod records;
pub mod source;
pub mod summary;
pub mod utils;
pub mod validation;

pub use config::Config;
pub use dashboard::Dashboard;
pub use directory::{DonorDirectory, DEFAULT_DONOR_TTL};
pub use error::DashboardError;
pub use records::{RecordService, WriteOutcome};
pub use summary::{summarize_month, MonthWindow, MonthlySummary};
