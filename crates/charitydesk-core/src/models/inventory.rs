use serde::{Deserialize, Serialize};

/// An entry in `inventory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(rename = "updatedBy", default)]
    pub updated_by: Option<String>,
}

impl InventoryItem {
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.quantity <= threshold
    }

    pub fn quantity_display(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} {}", self.quantity, unit),
            None => self.quantity.to_string(),
        }
    }
}

/// Fields of an inventory item to change. Unset fields are left as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "updatedBy", skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_stock() {
        let item: InventoryItem =
            serde_json::from_str(r#"{"name": "Blankets", "quantity": 3, "unit": "boxes"}"#).unwrap();
        assert!(item.is_low_stock(5));
        assert!(item.is_low_stock(3));
        assert!(!item.is_low_stock(2));
        assert_eq!(item.quantity_display(), "3 boxes");
    }
}
