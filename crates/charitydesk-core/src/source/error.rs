use thiserror::Error;

/// Failure talking to the document source.
///
/// `Clone` so one failed fetch can be handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Unauthorized - database token missing or expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Data source unavailable: {0}")]
    Unavailable(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl SourceError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => SourceError::Unauthorized,
            403 => SourceError::AccessDenied(truncated),
            404 => SourceError::NotFound(truncated),
            429 => SourceError::RateLimited,
            500..=599 => SourceError::Server(truncated),
            _ => SourceError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited
                | SourceError::Server(_)
                | SourceError::Network(_)
                | SourceError::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::InvalidResponse(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert_eq!(SourceError::from_status(StatusCode::UNAUTHORIZED, ""), SourceError::Unauthorized);
        assert_eq!(
            SourceError::from_status(StatusCode::FORBIDDEN, "Permission denied"),
            SourceError::AccessDenied("Permission denied".to_string())
        );
        assert_eq!(SourceError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), SourceError::RateLimited);
        assert!(matches!(
            SourceError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            SourceError::Server(_)
        ));
        assert!(matches!(
            SourceError::from_status(StatusCode::BAD_REQUEST, "bad"),
            SourceError::InvalidResponse(msg) if msg.contains("400")
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        match SourceError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            SourceError::Server(msg) => {
                assert!(msg.len() < 600);
                assert!(msg.ends_with("(truncated, 2000 total bytes)"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_is_transient() {
        assert!(SourceError::RateLimited.is_transient());
        assert!(SourceError::Network("reset".into()).is_transient());
        assert!(!SourceError::Unauthorized.is_transient());
        assert!(!SourceError::NotFound("donors/x".into()).is_transient());
    }
}
