//! Configuration types and loading
//!
//! Config precedence: `--config` flag > `CARTODB_CONFIG` env var >
//! `cartodb.toml`. The account password and the consumer secret are read
//! from `CARTODB_PASSWORD` / `CARTODB_CONSUMER_SECRET` or from the matching
//! `*_file` option, never from the TOML itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cartodb_auth::{AccountContext, ConsumerCredentials, Endpoints, Namespace, TokenCache};
use cartodb_client::ClientConfig;
use common::Secret;
use serde::Deserialize;

const PASSWORD_ENV: &str = "CARTODB_PASSWORD";
const CONSUMER_SECRET_ENV: &str = "CARTODB_CONSUMER_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub account: AccountSection,
    pub consumer: ConsumerSection,
    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Debug, Deserialize)]
pub struct AccountSection {
    pub namespace: String,
    pub email: String,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// File holding the password (alternative to CARTODB_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct ConsumerSection {
    pub key: String,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
}

/// Transport and cache settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Account host for on-prem installs; overrides `domain`.
    pub base_url: Option<String>,
    pub domain: String,
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
    pub decode_json: bool,
    /// Token cache directory. Defaults to the system temp dir.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: None,
            domain: cartodb_auth::DEFAULT_DOMAIN.to_string(),
            timeout_secs: 30,
            accept_invalid_certs: false,
            decode_json: true,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then resolve secrets.
    ///
    /// Secret resolution order, per secret:
    /// 1. environment variable
    /// 2. `*_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        Namespace::new(config.account.namespace.as_str())
            .map_err(|e| common::Error::Config(e.to_string()))?;

        if let Some(ref base_url) = config.client.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "base_url must start with http:// or https://, got: {base_url}"
                )));
            }
        }

        if config.client.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        config.account.password =
            resolve_secret(PASSWORD_ENV, config.account.password_file.as_deref())?;
        config.consumer.secret =
            resolve_secret(CONSUMER_SECRET_ENV, config.consumer.secret_file.as_deref())?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CARTODB_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CARTODB_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("cartodb.toml")
    }

    /// Build the client settings. Fails if either secret is unresolved.
    pub fn client_config(&self) -> common::Result<ClientConfig> {
        let namespace = Namespace::new(self.account.namespace.as_str())
            .map_err(|e| common::Error::Config(e.to_string()))?;
        let password = self
            .account
            .password
            .clone()
            .ok_or(common::Error::MissingSecret(PASSWORD_ENV))?;
        let consumer_secret = self
            .consumer
            .secret
            .clone()
            .ok_or(common::Error::MissingSecret(CONSUMER_SECRET_ENV))?;

        let endpoints = match self.client.base_url {
            Some(ref base) => Endpoints::from_base(base),
            None => Endpoints::for_namespace(&namespace, Some(&self.client.domain)),
        };
        let cache = match self.client.cache_dir {
            Some(ref dir) => TokenCache::new(dir),
            None => TokenCache::in_temp_dir(),
        };

        let consumer = ConsumerCredentials::new(self.consumer.key.clone(), consumer_secret);
        let account = AccountContext::new(namespace, self.account.email.clone(), password);
        Ok(ClientConfig::new(consumer, account)
            .with_endpoints(endpoints)
            .with_cache(cache)
            .with_timeout(Duration::from_secs(self.client.timeout_secs))
            .accept_invalid_certs(self.client.accept_invalid_certs)
            .decode_json(self.client.decode_json))
    }
}

/// Env var first, then file contents (trimmed). Empty values count as unset.
fn resolve_secret(env: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env) {
        if !value.is_empty() {
            return Ok(Some(Secret::new(value)));
        }
    }
    let Some(file) = file else {
        return Ok(None);
    };
    let value = std::fs::read_to_string(file).map_err(|e| {
        common::Error::Config(format!("failed to read {}: {e}", file.display()))
    })?;
    let value = value.trim().to_owned();
    Ok((!value.is_empty()).then(|| Secret::new(value)))
}
