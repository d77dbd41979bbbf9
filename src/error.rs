/// Error taxonomy for everything that crosses the review store boundary
///
/// All three kinds are shown to the user as a status message; none of them
/// abort the application.
use thiserror::Error;

/// Failures surfaced by the review client
///
/// Carried inside UI messages, so it owns plain strings instead of the
/// underlying transport errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReviewError {
    /// Required local fields are missing. The request is never sent.
    #[error("{0}")]
    Validation(String),

    /// Connection failure, timeout, or any other transport problem
    #[error("Network error: {0}")]
    Network(String),

    /// The store answered with a non-success status (or an unreadable body)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl ReviewError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReviewError::Validation(message.into())
    }

    /// Whether the failure happened before anything was sent
    pub fn is_validation(&self) -> bool {
        matches!(self, ReviewError::Validation(_))
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ReviewError::Network("request timed out".to_string());
        }

        // Bodies are decoded by the transport, so only status errors carry a code here
        match err.status() {
            Some(status) => ReviewError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => ReviewError::Network(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ReviewError::validation("Please add a title").to_string(),
            "Please add a title"
        );
        assert_eq!(
            ReviewError::Network("connection refused".into()).to_string(),
            "Network error: connection refused"
        );
        assert_eq!(
            ReviewError::Server { status: 500, message: "boom".into() }.to_string(),
            "Server error (500): boom"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(ReviewError::validation("x").is_validation());
        assert!(!ReviewError::Network("x".into()).is_validation());
    }
}
