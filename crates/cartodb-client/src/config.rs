//! Client construction settings

use std::time::Duration;

use cartodb_auth::{AccountContext, ConsumerCredentials, Endpoints, TokenCache};

/// Default per-request timeout at the transport layer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything `CartoClient` needs. Defaults: hosted endpoints for the
/// account's namespace, token cache in the temp dir, 30s timeout, TLS
/// verification on, JSON decoding on.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub consumer: ConsumerCredentials,
    pub account: AccountContext,
    pub endpoints: Endpoints,
    pub cache: TokenCache,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub decode_json: bool,
}

impl ClientConfig {
    pub fn new(consumer: ConsumerCredentials, account: AccountContext) -> Self {
        let endpoints = Endpoints::for_namespace(&account.namespace, None);
        Self {
            consumer,
            account,
            endpoints,
            cache: TokenCache::in_temp_dir(),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
            decode_json: true,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_cache(mut self, cache: TokenCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable TLS certificate and hostname verification. Off by default.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn decode_json(mut self, decode: bool) -> Self {
        self.decode_json = decode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartodb_auth::Namespace;

    fn config() -> ClientConfig {
        ClientConfig::new(
            ConsumerCredentials::new("K", "S"),
            AccountContext::new(Namespace::new("acme").unwrap(), "ops@acme.test", "pw"),
        )
    }

    #[test]
    fn defaults_are_safe() {
        let config = config();
        assert!(!config.accept_invalid_certs);
        assert!(config.decode_json);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(
            config.endpoints.access_token_url(),
            "https://acme.cartodb.com/oauth/access_token"
        );
        assert_eq!(config.cache.dir(), std::env::temp_dir());
    }

    #[test]
    fn builders_override_defaults() {
        let config = config()
            .with_endpoints(Endpoints::from_base("http://localhost:9000"))
            .with_timeout(Duration::from_secs(5))
            .accept_invalid_certs(true)
            .decode_json(false);
        assert_eq!(
            config.endpoints.resource_url("sql"),
            "http://localhost:9000/api/v1/sql"
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.accept_invalid_certs);
        assert!(!config.decode_json);
    }
}
