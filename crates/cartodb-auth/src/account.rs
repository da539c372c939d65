//! Consumer credentials, account identity, and endpoint layout

use std::fmt;

use common::Secret;
use serde::{Deserialize, Serialize};

use crate::constants::{ACCESS_TOKEN_PATH, API_PREFIX, DEFAULT_DOMAIN};
use crate::error::{AuthError, Result};

/// Per-account identifier. Scopes both the API host and the cached token.
///
/// Restricted to ASCII alphanumerics, `-` and `_` so it can be used as a
/// subdomain label and as a cache filename without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(AuthError::InvalidNamespace("namespace must not be empty".into()));
        }
        if let Some(c) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(AuthError::InvalidNamespace(format!(
                "{value:?} contains {c:?}; only ASCII letters, digits, '-' and '_' are allowed"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

/// Application-level key/secret identifying the calling app.
#[derive(Debug, Clone)]
pub struct ConsumerCredentials {
    pub key: String,
    pub secret: Secret<String>,
}

impl ConsumerCredentials {
    pub fn new(key: impl Into<String>, secret: impl Into<Secret<String>>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// Identity used only during the password exchange.
#[derive(Debug, Clone)]
pub struct AccountContext {
    pub namespace: Namespace,
    pub email: String,
    pub password: Secret<String>,
}

impl AccountContext {
    pub fn new(
        namespace: Namespace,
        email: impl Into<String>,
        password: impl Into<Secret<String>>,
    ) -> Self {
        Self {
            namespace,
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Absolute URLs of the token endpoint and the resource API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    access_token_url: String,
    api_base: String,
}

impl Endpoints {
    /// `https://{namespace}.{domain}`, the hosted layout.
    pub fn for_namespace(namespace: &Namespace, domain: Option<&str>) -> Self {
        let domain = domain.unwrap_or(DEFAULT_DOMAIN);
        Self::from_base(&format!("https://{namespace}.{domain}"))
    }

    /// Explicit account host, e.g. an on-prem install or a local mock.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            access_token_url: format!("{base}{ACCESS_TOKEN_PATH}"),
            api_base: format!("{base}{API_PREFIX}"),
        }
    }

    pub fn access_token_url(&self) -> &str {
        &self.access_token_url
    }

    /// Resolve a resource path (`sql`, `tables/foo`) against `/api/v1/`.
    pub fn resource_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path.trim_start_matches('/'))
    }
}
