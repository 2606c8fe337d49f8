//! Reads and validated writes on the `inventory` and `finances` collections.
//!
//! Every write is checked before it reaches the network, confirmed against
//! the stored record, stamped with the current user, and answered with a
//! `WriteOutcome` or a `DashboardError`. Nothing here shows anything to the
//! user; presentation is up to the caller.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::error::DashboardError;
use crate::models::{
    decode_collection, CurrentUser, InventoryItem, InventoryUpdate, Keyed, Transaction,
    TransactionUpdate,
};
use crate::source::{DocumentSource, SourceError, FINANCES_PATH, INVENTORY_PATH};
use crate::summary::{summarize_month, MonthlySummary};
use crate::validation::{validate_inventory_update, validate_key, validate_transaction_update, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Updated { path: &'static str, key: String },
    Removed { path: &'static str, key: String },
}

pub struct RecordService {
    source: Arc<dyn DocumentSource>,
    current_user: Option<CurrentUser>,
}

impl RecordService {
    pub fn new(source: Arc<dyn DocumentSource>, current_user: Option<CurrentUser>) -> Self {
        Self {
            source,
            current_user,
        }
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    fn audit_stamp(&self) -> Option<String> {
        self.current_user.as_ref().map(CurrentUser::audit_name)
    }

    // ===== Reads =====

    pub async fn inventory(&self) -> Result<Vec<Keyed<InventoryItem>>, DashboardError> {
        self.read_collection(INVENTORY_PATH).await
    }

    pub async fn low_stock(&self, threshold: i64) -> Result<Vec<Keyed<InventoryItem>>, DashboardError> {
        let mut items = self.inventory().await?;
        items.retain(|item| item.record.is_low_stock(threshold));
        items.sort_by_key(|item| item.record.quantity);
        Ok(items)
    }

    pub async fn transactions(&self) -> Result<Vec<Keyed<Transaction>>, DashboardError> {
        self.read_collection(FINANCES_PATH).await
    }

    /// Income and expense totals for the month containing `reference`.
    pub async fn monthly_summary<Tz: TimeZone>(
        &self,
        reference: &DateTime<Tz>,
    ) -> Result<MonthlySummary, DashboardError> {
        let transactions = self.transactions().await?;
        Ok(summarize_month(
            transactions.iter().map(|t| &t.record),
            reference,
        ))
    }

    pub async fn inventory_item(&self, key: &str) -> Result<InventoryItem, DashboardError> {
        self.read_record(INVENTORY_PATH, key).await
    }

    pub async fn transaction(&self, key: &str) -> Result<Transaction, DashboardError> {
        self.read_record(FINANCES_PATH, key).await
    }

    // ===== Writes =====

    pub async fn update_inventory(
        &self,
        key: &str,
        mut update: InventoryUpdate,
    ) -> Result<WriteOutcome, DashboardError> {
        validate_inventory_update(key, &update)?;
        update.updated_by = self.audit_stamp();
        self.apply_update(INVENTORY_PATH, key, &update).await
    }

    pub async fn remove_inventory(&self, key: &str) -> Result<WriteOutcome, DashboardError> {
        self.apply_remove(INVENTORY_PATH, key).await
    }

    pub async fn update_transaction(
        &self,
        key: &str,
        mut update: TransactionUpdate,
    ) -> Result<WriteOutcome, DashboardError> {
        validate_transaction_update(key, &update)?;
        update.updated_by = self.audit_stamp();
        self.apply_update(FINANCES_PATH, key, &update).await
    }

    pub async fn remove_transaction(&self, key: &str) -> Result<WriteOutcome, DashboardError> {
        self.apply_remove(FINANCES_PATH, key).await
    }

    // ===== Helpers =====

    async fn read_collection<T: serde::de::DeserializeOwned>(
        &self,
        path: &'static str,
    ) -> Result<Vec<Keyed<T>>, DashboardError> {
        let docs = self
            .source
            .read(path)
            .await
            .map_err(|source| fetch_error(path, source))?;
        Ok(decode_collection(path, docs))
    }

    async fn read_record<T: serde::de::DeserializeOwned>(
        &self,
        path: &'static str,
        key: &str,
    ) -> Result<T, DashboardError> {
        validate_key(key).map_err(|e| ValidationErrors(vec![e]))?;
        let value = self.require_existing(path, key).await?;
        serde_json::from_value(value).map_err(|e| {
            fetch_error(path, SourceError::InvalidResponse(format!("{}/{}: {}", path, key, e)))
        })
    }

    async fn require_existing(&self, path: &'static str, key: &str) -> Result<Value, DashboardError> {
        match self.source.read_one(path, key).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(DashboardError::NotFound {
                path,
                key: key.to_string(),
            }),
            Err(source) => Err(fetch_error(path, source)),
        }
    }

    async fn apply_update<P: Serialize>(
        &self,
        path: &'static str,
        key: &str,
        update: &P,
    ) -> Result<WriteOutcome, DashboardError> {
        let payload = serde_json::to_value(update).map_err(|e| DashboardError::Update {
            path,
            key: key.to_string(),
            source: SourceError::InvalidRequest(e.to_string()),
        })?;

        // The database would create a missing record on update
        self.require_existing(path, key).await?;

        match self.source.update(path, key, &payload).await {
            Ok(()) => {
                info!(path, key, "Record updated");
                Ok(WriteOutcome::Updated {
                    path,
                    key: key.to_string(),
                })
            }
            Err(source) => {
                error!(path, key, error = %source, "Update failed");
                Err(DashboardError::Update {
                    path,
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    async fn apply_remove(&self, path: &'static str, key: &str) -> Result<WriteOutcome, DashboardError> {
        validate_key(key).map_err(|e| ValidationErrors(vec![e]))?;
        self.require_existing(path, key).await?;

        match self.source.remove(path, key).await {
            Ok(()) => {
                info!(path, key, "Record removed");
                Ok(WriteOutcome::Removed {
                    path,
                    key: key.to_string(),
                })
            }
            Err(source) => {
                error!(path, key, error = %source, "Remove failed");
                Err(DashboardError::Remove {
                    path,
                    key: key.to_string(),
                    source,
                })
            }
        }
    }
}

fn fetch_error(path: &'static str, source: SourceError) -> DashboardError {
    error!(path, error = %source, "Read failed");
    DashboardError::Fetch { path, source }
}
