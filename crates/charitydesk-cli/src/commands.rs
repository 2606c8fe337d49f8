//! Command handlers. Each one prints its result to stdout and turns a
//! `DashboardError` into a readable message.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, TimeZone};
use serde_json::Value;
use tracing::error;

use charitydesk_core::cache::SystemClock;
use charitydesk_core::models::{CurrentUser, InventoryUpdate, TransactionUpdate};
use charitydesk_core::profile::CurrentUserStore;
use charitydesk_core::source::{MemorySource, DONORS_PATH, FINANCES_PATH, INVENTORY_PATH};
use charitydesk_core::utils::{format_money, truncate};
use charitydesk_core::{Config, Dashboard, DashboardError, WriteOutcome};

use crate::cli::Command;

/// Width of the name column in listings
const NAME_WIDTH: usize = 28;

/// Build a dashboard backed by a JSON export with `donors`, `finances` and
/// `inventory` at the top level.
pub fn dashboard_from_seed(path: &Path, config: &Config, user: Option<CurrentUser>) -> Result<Dashboard> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let mut root: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

    let source = MemorySource::new();
    for collection in [DONORS_PATH, FINANCES_PATH, INVENTORY_PATH] {
        let value = root.get_mut(collection).map(Value::take).unwrap_or(Value::Null);
        source
            .replace_collection(collection, value)
            .with_context(|| format!("Seed collection '{}' is not an object", collection))?;
    }

    Ok(Dashboard::new(Arc::new(source), Arc::new(SystemClock), config, user))
}

pub async fn run(command: Command, dashboard: &Dashboard) -> Result<()> {
    match command {
        Command::Donors { search, refresh } => {
            if refresh {
                report(dashboard.donors.refresh().await)?;
            }
            let donors = match search {
                Some(query) => report(dashboard.donors.search(&query).await)?,
                None => report(dashboard.donors.donors().await)?.to_vec(),
            };
            for donor in &donors {
                println!(
                    "{:<20} {:<width$} {:>12}  last gift {}",
                    donor.key,
                    truncate(&donor.record.name, NAME_WIDTH),
                    donor.record.total_display(),
                    donor.record.last_donation_display(),
                    width = NAME_WIDTH,
                );
            }
            println!(
                "{} donor(s), list refreshed {}, kept for {}s",
                donors.len(),
                dashboard.donors.last_refreshed().unwrap_or_else(|| "never".to_string()),
                dashboard.donors.ttl().as_secs()
            );
        }

        Command::Summary { month } => {
            let reference = match month {
                Some((year, month)) => month_reference(dashboard, year, month)?,
                None => dashboard.now(),
            };
            let summary = report(dashboard.records.monthly_summary(&reference).await)?;
            println!("{}", summary.window.label());
            println!("  income   {:>14}", format_money(summary.income));
            println!("  expense  {:>14}", format_money(summary.expense));
            println!("  net      {:>14}", format_money(summary.net()));
            println!("  {} transaction(s) counted", summary.counted);
            if summary.skipped > 0 {
                println!("  {} transaction(s) skipped: missing or unreadable date", summary.skipped);
            }
        }

        Command::Inventory { low } => {
            let items = match low {
                Some(threshold) => report(dashboard.records.low_stock(threshold).await)?,
                None => report(dashboard.records.inventory().await)?,
            };
            for item in &items {
                println!(
                    "{:<20} {:<width$} {:>10}  {}",
                    item.key,
                    truncate(&item.record.name, NAME_WIDTH),
                    item.record.quantity_display(),
                    item.record.category.as_deref().unwrap_or("-"),
                    width = NAME_WIDTH,
                );
            }
            println!("{} item(s)", items.len());
        }

        Command::UpdateItem {
            key,
            name,
            quantity,
            category,
            unit,
        } => {
            let update = InventoryUpdate {
                name,
                quantity,
                category,
                unit,
                updated_by: None,
            };
            print_outcome(report(dashboard.records.update_inventory(&key, update).await)?);
        }

        Command::RemoveItem { key } => {
            print_outcome(report(dashboard.records.remove_inventory(&key).await)?);
        }

        Command::UpdateTransaction {
            key,
            kind,
            amount,
            date,
            description,
            category,
        } => {
            let update = TransactionUpdate {
                kind,
                amount,
                date,
                description,
                category,
                updated_by: None,
            };
            print_outcome(report(dashboard.records.update_transaction(&key, update).await)?);
        }

        Command::RemoveTransaction { key } => {
            print_outcome(report(dashboard.records.remove_transaction(&key).await)?);
        }

        Command::Config { .. } | Command::Whoami { .. } => {
            bail!("this command is handled before connecting");
        }
    }

    Ok(())
}

/// Print the effective configuration, and write it out with `save`.
pub fn show_config(config: &Config, save: bool) -> Result<()> {
    println!("database url      {}", config.database_url.as_deref().unwrap_or("(not set)"));
    println!("auth token        {}", if config.auth_token.is_some() { "set" } else { "not set" });
    println!("donor cache ttl   {} ms", config.donor_cache_ttl_ms);
    println!("utc offset        {}", config.timezone());
    if save {
        config.save()?;
        println!("Saved");
    }
    Ok(())
}

/// Show, set or forget the user edits are attributed to.
pub fn whoami(
    user_store: &CurrentUserStore,
    set: Option<String>,
    name: Option<String>,
    email: Option<String>,
    clear: bool,
) -> Result<()> {
    if clear {
        user_store.clear()?;
        println!("Signed out");
    } else if let Some(uid) = set {
        let user = CurrentUser {
            uid,
            name,
            email,
            role: None,
        };
        user_store.save(&user)?;
        println!("Edits will be attributed to {}", user.audit_name());
    } else {
        match user_store.load()? {
            Some(user) => println!("{} ({})", user.audit_name(), user.uid),
            None => println!("Not signed in"),
        }
    }
    Ok(())
}

/// Noon on the first of the month, in the dashboard's timezone
fn month_reference(
    dashboard: &Dashboard,
    year: i32,
    month: u32,
) -> Result<chrono::DateTime<chrono::FixedOffset>> {
    let Some(noon) = NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(12, 0, 0)) else {
        bail!("{}-{:02} is not a valid month", year, month);
    };
    dashboard
        .now()
        .timezone()
        .from_local_datetime(&noon)
        .single()
        .context("Ambiguous local time for month start")
}

/// Log a dashboard error and hand back the user-facing message
fn report<T>(result: Result<T, DashboardError>) -> Result<T> {
    result.map_err(|e| {
        let retryable = e.is_retryable();
        error!(error = %e, retryable, "Command failed");
        if retryable {
            anyhow::anyhow!("{} (temporary problem, safe to run the command again)", e.user_message())
        } else {
            anyhow::anyhow!(e.user_message())
        }
    })
}

fn print_outcome(outcome: WriteOutcome) {
    match outcome {
        WriteOutcome::Updated { path, key } => println!("Updated {}/{}", path, key),
        WriteOutcome::Removed { path, key } => println!("Removed {}/{}", path, key),
    }
}
