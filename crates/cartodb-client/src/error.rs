//! Error types for the request pipeline

use cartodb_auth::AuthError;

/// Errors returned by `CartoClient` operations.
///
/// Nothing inside the client logs-and-swallows: every failure reaches the
/// caller as one of these.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No token could be obtained in the first place (cache miss followed by
    /// a failed exchange).
    #[error("authentication failed: {0}")]
    Auth(AuthError),

    /// A resource request was rejected with 401 and re-authentication did not
    /// fix it. Terminal for that call.
    #[error("authorization failed: {reason}")]
    AuthFailed {
        reason: String,
        #[source]
        source: Option<AuthError>,
    },

    /// Any non-2xx, non-401 response. `body` is the raw response body.
    #[error("request failed ({status}): {body}")]
    RequestFailed { status: u16, body: String },

    /// A freshly acquired token could not be persisted.
    #[error("token cache unavailable: {0}")]
    StoreUnavailable(String),

    /// The resource request never produced a response (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Store(msg) => ApiError::StoreUnavailable(msg),
            AuthError::InvalidUrl(msg)
            | AuthError::InvalidNamespace(msg)
            | AuthError::Signing(msg) => ApiError::Config(msg),
            other => ApiError::Auth(other),
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
