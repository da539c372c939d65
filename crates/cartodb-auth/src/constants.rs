//! CartoDB endpoint and protocol constants
//!
//! The token endpoint and the resource API live under the same per-account
//! host (`https://{namespace}.cartodb.com`). These values identify protocol
//! shapes only; the actual secrets are held in `AccountContext` and
//! `ConsumerCredentials`.

/// Default domain appended to the namespace to form the account host.
pub const DEFAULT_DOMAIN: &str = "cartodb.com";

/// Path of the xAuth password exchange endpoint, relative to the account host.
pub const ACCESS_TOKEN_PATH: &str = "/oauth/access_token";

/// Prefix of every resource endpoint, relative to the account host.
pub const API_PREFIX: &str = "/api/v1/";

/// xAuth mode sent with the password exchange.
pub const X_AUTH_MODE: &str = "client_auth";

/// OAuth signature method name.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// OAuth protocol version parameter.
pub const OAUTH_VERSION: &str = "1.0";

/// Suffix of the per-namespace token cache file.
pub const TOKEN_CACHE_SUFFIX: &str = ".cartodb-token.json";
