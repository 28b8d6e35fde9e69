//! Xero client error type

use std::fmt;

/// Errors from the identity and accounting endpoints
#[derive(Debug)]
pub enum XeroError {
    /// Credentials were rejected (HTTP 401/403)
    Unauthorized { operation: &'static str, status: u16 },

    /// Any other non-success status
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Transport failure (connect, timeout, TLS, body read)
    Http(reqwest::Error),

    /// Response or token could not be decoded
    Decode(String),

    /// The callback URL carried a provider error or no code
    Callback(String),

    /// The client cannot build a request from its settings
    Config(String),
}

impl fmt::Display for XeroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XeroError::Unauthorized { operation, status } => {
                write!(f, "{} rejected credentials (status {})", operation, status)
            }
            XeroError::Status {
                operation,
                status,
                body,
            } => write!(f, "{} failed (status {}): {}", operation, status, body),
            XeroError::Http(e) => write!(f, "HTTP error: {}", e),
            XeroError::Decode(msg) => write!(f, "Decode error: {}", msg),
            XeroError::Callback(msg) => write!(f, "Invalid callback: {}", msg),
            XeroError::Config(msg) => write!(f, "Client misconfigured: {}", msg),
        }
    }
}

impl std::error::Error for XeroError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XeroError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for XeroError {
    fn from(e: reqwest::Error) -> Self {
        XeroError::Http(e)
    }
}

impl XeroError {
    /// Whether the upstream refused the token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, XeroError::Unauthorized { .. })
    }
}
