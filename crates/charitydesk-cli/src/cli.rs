//! Command-line argument parsing.

use std::path::PathBuf;

use charitydesk_core::models::TransactionKind;
use clap::{Parser, Subcommand};

/// Charity dashboard - donors, inventory and monthly finances
#[derive(Parser, Debug)]
#[command(name = "charitydesk")]
#[command(about = "Donor, inventory and finance records for a small charity")]
#[command(version)]
pub struct Cli {
    /// Database root URL (overrides config and CHARITYDESK_DATABASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub database_url: Option<String>,

    /// Work against a JSON export instead of the live database.
    /// Changes are not written back to the file.
    #[arg(long, global = true, value_name = "FILE", conflicts_with = "database_url")]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List donors
    Donors {
        /// Only donors whose name or email contains this text
        #[arg(long)]
        search: Option<String>,
        /// Ignore the cached list and fetch again
        #[arg(long)]
        refresh: bool,
    },

    /// Income and expense totals for a month
    Summary {
        /// Month to summarize as YYYY-MM (defaults to the current month)
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },

    /// List inventory
    Inventory {
        /// Only items with at most this many on hand
        #[arg(long, value_name = "QUANTITY")]
        low: Option<i64>,
    },

    /// Change fields of an inventory item
    UpdateItem {
        /// Record key (keys often start with '-')
        #[arg(allow_hyphen_values = true)]
        key: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        quantity: Option<i64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        unit: Option<String>,
    },

    /// Delete an inventory item
    RemoveItem {
        #[arg(allow_hyphen_values = true)]
        key: String,
    },

    /// Change fields of a finance transaction
    UpdateTransaction {
        #[arg(allow_hyphen_values = true)]
        key: String,
        #[arg(long = "type", value_parser = parse_kind)]
        kind: Option<TransactionKind>,
        #[arg(long, allow_negative_numbers = true)]
        amount: Option<f64>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },

    /// Delete a finance transaction
    RemoveTransaction {
        #[arg(allow_hyphen_values = true)]
        key: String,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file, including command-line and
        /// environment overrides
        #[arg(long)]
        save: bool,
    },

    /// Show or change who edits are attributed to
    Whoami {
        /// Sign in as this user id
        #[arg(long, value_name = "UID")]
        set: Option<String>,
        #[arg(long, requires = "set")]
        name: Option<String>,
        #[arg(long, requires = "set")]
        email: Option<String>,
        /// Forget the current user
        #[arg(long, conflicts_with = "set")]
        clear: bool,
    },
}

pub fn parse_month(s: &str) -> Result<(i32, u32), String> {
    let (year, month) = s
        .trim()
        .split_once('-')
        .ok_or_else(|| format!("'{}' is not YYYY-MM", s))?;
    let year: i32 = year.parse().map_err(|_| format!("invalid year in '{}'", s))?;
    let month: u32 = month.parse().map_err(|_| format!("invalid month in '{}'", s))?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be 01-12, got {}", month));
    }
    Ok((year, month))
}

fn parse_kind(s: &str) -> Result<TransactionKind, String> {
    s.parse()
}
