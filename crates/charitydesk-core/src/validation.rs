//! Checks run on user input before anything is sent to the database.

use chrono::Utc;
use thiserror::Error;

use crate::models::{InventoryUpdate, TransactionUpdate};
use crate::summary::parse_transaction_date;

/// Longest key the database accepts
const MAX_KEY_LENGTH: usize = 768;

const MAX_NAME_LENGTH: usize = 200;

const MAX_TEXT_LENGTH: usize = 1000;

/// Characters the database forbids in keys
const FORBIDDEN_KEY_CHARS: &[char] = &['.', '#', '$', '[', ']', '/'];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} '{value}' is not a valid date (use YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("record key '{0}' contains characters that are not allowed")]
    InvalidKey(String),

    #[error("nothing to update")]
    EmptyUpdate,
}

/// Every problem found in one form submission.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", join_messages(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.trim().is_empty() {
        return Err(ValidationError::Missing { field: "key" });
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "key",
            max: MAX_KEY_LENGTH,
        });
    }
    if key.chars().any(|c| FORBIDDEN_KEY_CHARS.contains(&c) || c.is_control()) {
        return Err(ValidationError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn check_text(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, max: usize, required: bool) {
    if required && value.trim().is_empty() {
        errors.push(ValidationError::Missing { field });
    } else if value.chars().count() > max {
        errors.push(ValidationError::TooLong { field, max });
    }
}

pub fn validate_inventory_update(key: &str, update: &InventoryUpdate) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if let Err(e) = validate_key(key) {
        errors.push(e);
    }

    if update.name.is_none()
        && update.quantity.is_none()
        && update.category.is_none()
        && update.unit.is_none()
    {
        errors.push(ValidationError::EmptyUpdate);
    }
    if let Some(name) = &update.name {
        check_text(&mut errors, "name", name, MAX_NAME_LENGTH, true);
    }
    if let Some(quantity) = update.quantity {
        if quantity < 0 {
            errors.push(ValidationError::Negative { field: "quantity" });
        }
    }
    if let Some(category) = &update.category {
        check_text(&mut errors, "category", category, MAX_NAME_LENGTH, false);
    }
    if let Some(unit) = &update.unit {
        check_text(&mut errors, "unit", unit, MAX_NAME_LENGTH, false);
    }

    ValidationErrors(errors).into_result()
}

pub fn validate_transaction_update(key: &str, update: &TransactionUpdate) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if let Err(e) = validate_key(key) {
        errors.push(e);
    }

    if update.kind.is_none()
        && update.amount.is_none()
        && update.date.is_none()
        && update.description.is_none()
        && update.category.is_none()
    {
        errors.push(ValidationError::EmptyUpdate);
    }
    if let Some(amount) = update.amount {
        if !amount.is_finite() || amount <= 0.0 {
            errors.push(ValidationError::NotPositive { field: "amount" });
        }
    }
    if let Some(date) = &update.date {
        if date.trim().is_empty() {
            errors.push(ValidationError::Missing { field: "date" });
        } else if parse_transaction_date(date, &Utc).is_none() {
            errors.push(ValidationError::InvalidDate {
                field: "date",
                value: date.clone(),
            });
        }
    }
    if let Some(description) = &update.description {
        check_text(&mut errors, "description", description, MAX_TEXT_LENGTH, false);
    }
    if let Some(category) = &update.category {
        check_text(&mut errors, "category", category, MAX_NAME_LENGTH, false);
    }

    ValidationErrors(errors).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("-NabcXYZ").is_ok());
        assert_eq!(validate_key(" "), Err(ValidationError::Missing { field: "key" }));
        assert!(matches!(validate_key("a/b"), Err(ValidationError::InvalidKey(_))));
        assert!(matches!(validate_key("a.b"), Err(ValidationError::InvalidKey(_))));
        assert!(matches!(
            validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_inventory_update_collects_all_errors() {
        let update = InventoryUpdate {
            name: Some("   ".to_string()),
            quantity: Some(-2),
            ..Default::default()
        };
        let errors = validate_inventory_update("-Nx", &update).unwrap_err();
        assert_eq!(errors.0.len(), 2);
        assert!(errors.0.contains(&ValidationError::Missing { field: "name" }));
        assert!(errors.0.contains(&ValidationError::Negative { field: "quantity" }));
        assert_eq!(errors.to_string(), "name is required; quantity must not be negative");
    }

    #[test]
    fn test_inventory_update_ok() {
        let update = InventoryUpdate {
            quantity: Some(0),
            ..Default::default()
        };
        assert!(validate_inventory_update("-Nx", &update).is_ok());
    }

    #[test]
    fn test_empty_update_rejected() {
        let errors = validate_inventory_update("-Nx", &InventoryUpdate::default()).unwrap_err();
        assert!(errors.0.contains(&ValidationError::EmptyUpdate));

        // updatedBy alone is not a user change
        let stamp_only = TransactionUpdate {
            updated_by: Some("u1".to_string()),
            ..Default::default()
        };
        let errors = validate_transaction_update("-Nt", &stamp_only).unwrap_err();
        assert!(errors.0.contains(&ValidationError::EmptyUpdate));
    }

    #[test]
    fn test_transaction_amount_and_date() {
        let update = TransactionUpdate {
            amount: Some(0.0),
            date: Some("March 3rd".to_string()),
            ..Default::default()
        };
        let errors = validate_transaction_update("-Nt", &update).unwrap_err();
        assert!(errors.0.contains(&ValidationError::NotPositive { field: "amount" }));
        assert!(errors.0.contains(&ValidationError::InvalidDate {
            field: "date",
            value: "March 3rd".to_string()
        }));

        let good = TransactionUpdate {
            kind: Some(TransactionKind::Expense),
            amount: Some(12.5),
            date: Some("2024-03-03".to_string()),
            ..Default::default()
        };
        assert!(validate_transaction_update("-Nt", &good).is_ok());
    }

    #[test]
    fn test_transaction_rejects_nan() {
        let update = TransactionUpdate {
            amount: Some(f64::NAN),
            ..Default::default()
        };
        assert!(validate_transaction_update("-Nt", &update).is_err());
    }
}
