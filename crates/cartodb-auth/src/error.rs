//! Error types for token acquisition and the token cache

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint answered with something other than 200.
    #[error("credential exchange rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The token endpoint could not be reached at all.
    #[error("token endpoint unreachable: {0}")]
    Unreachable(String),

    /// A 200 response whose body is not a usable token pair.
    #[error("malformed token response: {0}")]
    MalformedToken(String),

    /// The token cache could not be written.
    #[error("token cache unavailable: {0}")]
    Store(String),

    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request signing failed: {0}")]
    Signing(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
