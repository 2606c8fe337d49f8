use thiserror::Error;

use crate::source::SourceError;
use crate::validation::ValidationErrors;

/// Everything a dashboard operation can report back to the UI.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("Failed to load {path}: {source}")]
    Fetch {
        path: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("Failed to update {path}/{key}: {source}")]
    Update {
        path: &'static str,
        key: String,
        #[source]
        source: SourceError,
    },

    #[error("Failed to remove {path}/{key}: {source}")]
    Remove {
        path: &'static str,
        key: String,
        #[source]
        source: SourceError,
    },

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("No record {key} in {path}")]
    NotFound { path: &'static str, key: String },
}

impl DashboardError {
    /// Short message suitable for showing to the person at the keyboard
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Fetch { path, source } => {
                format!("Could not load {}. {}", path, hint(source))
            }
            DashboardError::Update { path, source, .. } => {
                format!("Could not save changes to {}. {}", path, hint(source))
            }
            DashboardError::Remove { path, source, .. } => {
                format!("Could not delete from {}. {}", path, hint(source))
            }
            DashboardError::Validation(errors) => {
                format!("Please fix the following: {}", errors)
            }
            DashboardError::NotFound { path, .. } => {
                format!("That {} record no longer exists. It may have been deleted.", singular(path))
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            DashboardError::Fetch { source, .. }
            | DashboardError::Update { source, .. }
            | DashboardError::Remove { source, .. } => source.is_transient(),
            DashboardError::Validation(_) | DashboardError::NotFound { .. } => false,
        }
    }
}

fn hint(source: &SourceError) -> &'static str {
    match source {
        SourceError::Unauthorized => "Please sign in again.",
        SourceError::AccessDenied(_) => "You do not have permission for this.",
        SourceError::RateLimited => "The server is busy, try again in a moment.",
        SourceError::Network(_) | SourceError::Unavailable(_) => "Check your connection and try again.",
        SourceError::Server(_) => "The server had a problem, try again later.",
        SourceError::NotFound(_) | SourceError::InvalidResponse(_) | SourceError::InvalidRequest(_) => {
            "Please report this problem."
        }
    }
}

fn singular(path: &str) -> &str {
    match path {
        "finances" => "transaction",
        "donors" => "donor",
        "inventory" => "inventory",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn test_user_messages() {
        let fetch = DashboardError::Fetch {
            path: "donors",
            source: SourceError::Network("connection reset".to_string()),
        };
        assert_eq!(fetch.user_message(), "Could not load donors. Check your connection and try again.");
        assert!(fetch.is_retryable());

        let missing = DashboardError::NotFound {
            path: "finances",
            key: "-Nt".to_string(),
        };
        assert!(missing.user_message().starts_with("That transaction record"));
        assert!(!missing.is_retryable());

        let invalid = DashboardError::from(ValidationErrors(vec![ValidationError::Negative {
            field: "quantity",
        }]));
        assert_eq!(
            invalid.user_message(),
            "Please fix the following: quantity must not be negative"
        );
    }

    #[test]
    fn test_display_includes_source() {
        let err = DashboardError::Update {
            path: "inventory",
            key: "-Nx".to_string(),
            source: SourceError::Unauthorized,
        };
        assert_eq!(
            err.to_string(),
            "Failed to update inventory/-Nx: Unauthorized - database token missing or expired"
        );
    }
}
