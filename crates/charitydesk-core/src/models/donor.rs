use serde::{Deserialize, Serialize};

use crate::utils::{contains_ignore_case, format_date, format_money};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "totalDonated", default)]
    pub total_donated: f64,
    #[serde(rename = "lastDonation", default)]
    pub last_donation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Donor {
    pub fn matches(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query)
            || self
                .email
                .as_deref()
                .is_some_and(|email| contains_ignore_case(email, query))
    }

    pub fn total_display(&self) -> String {
        format_money(self.total_donated)
    }

    pub fn last_donation_display(&self) -> String {
        match &self.last_donation {
            Some(date) => format_date(date),
            None => "never".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_donor_parses_with_defaults() {
        let donor: Donor = serde_json::from_str(r#"{"name": "Ada Lovelace"}"#).unwrap();
        assert_eq!(donor.name, "Ada Lovelace");
        assert_eq!(donor.total_donated, 0.0);
        assert_eq!(donor.last_donation_display(), "never");
    }

    #[test]
    fn test_donor_matches_name_or_email() {
        let donor: Donor = serde_json::from_str(
            r#"{"name": "Grace Hopper", "email": "grace@navy.example", "totalDonated": 1250.5}"#,
        )
        .unwrap();
        assert!(donor.matches("hopper"));
        assert!(donor.matches("NAVY"));
        assert!(!donor.matches("lovelace"));
        assert_eq!(donor.total_display(), "$1,250.50");
    }
}
