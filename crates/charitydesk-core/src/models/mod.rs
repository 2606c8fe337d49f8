//! Data models for dashboard records.
//!
//! - `Donor`: donor contact and giving totals (`donors`)
//! - `Transaction`, `TransactionKind`: income and expense entries (`finances`)
//! - `InventoryItem`: stock on hand (`inventory`)
//! - `CurrentUser`: the signed-in operator, used to stamp `updatedBy`

pub mod donor;
pub mod inventory;
pub mod transaction;
pub mod user;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::source::Document;

pub use donor::Donor;
pub use inventory::{InventoryItem, InventoryUpdate};
pub use transaction::{Transaction, TransactionKind, TransactionUpdate};
pub use user::CurrentUser;

/// A record together with its key in the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    pub key: String,
    pub record: T,
}

/// Decode every document of a collection, skipping the ones that do not
/// fit `T`. One bad record should not hide the rest of the list.
pub fn decode_collection<T: DeserializeOwned>(path: &str, docs: Vec<Document>) -> Vec<Keyed<T>> {
    docs.into_iter()
        .filter_map(|doc| match serde_json::from_value::<T>(doc.value) {
            Ok(record) => Some(Keyed {
                key: doc.key,
                record,
            }),
            Err(e) => {
                warn!(path, key = %doc.key, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}
