//! Monthly income and expense totals.
//!
//! A transaction belongs to a month when its date, read in the reference
//! instant's timezone, falls in the same calendar year and month. Date-only
//! strings are calendar dates in that timezone; timestamps carrying an
//! offset are converted into it first. Dates that cannot be read are
//! skipped and counted, never fatal.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;
use tracing::debug;

use crate::models::{Transaction, TransactionKind};

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
}

impl MonthWindow {
    pub fn containing<Tz: TimeZone>(reference: &DateTime<Tz>) -> Self {
        Self {
            year: reference.year(),
            month: reference.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(first) => first.format("%B %Y").to_string(),
            None => format!("{}-{:02}", self.year, self.month),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub window: MonthWindow,
    pub income: f64,
    pub expense: f64,
    /// Transactions that fell inside the window
    pub counted: usize,
    /// Transactions with a missing or unreadable date or amount
    pub skipped: usize,
}

impl MonthlySummary {
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

/// Calendar date of a stored date string, as seen from `tz`.
pub fn parse_transaction_date<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(tz).date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    // Local timestamps without an offset are already in the reference zone
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Sum income and expense for the month containing `reference`.
pub fn summarize_month<'a, Tz, I>(transactions: I, reference: &DateTime<Tz>) -> MonthlySummary
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a Transaction>,
{
    let window = MonthWindow::containing(reference);
    let tz = reference.timezone();

    let mut summary = MonthlySummary {
        window,
        income: 0.0,
        expense: 0.0,
        counted: 0,
        skipped: 0,
    };

    for tx in transactions {
        let date = tx
            .date
            .as_deref()
            .and_then(|raw| parse_transaction_date(raw, &tz));

        let date = match date {
            Some(date) if tx.amount.is_finite() => date,
            _ => {
                debug!(date = ?tx.date, amount = tx.amount, "Skipping transaction without usable date or amount");
                summary.skipped += 1;
                continue;
            }
        };

        if !window.contains(date) {
            continue;
        }

        summary.counted += 1;
        match tx.kind {
            TransactionKind::Income => summary.income += tx.amount,
            TransactionKind::Expense => summary.expense += tx.amount,
        }
    }

    summary
}
