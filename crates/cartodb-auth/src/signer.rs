//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Every request to CartoDB, including the password exchange itself, carries
//! the OAuth protocol parameters plus an `oauth_signature` computed over the
//! signing base string:
//!
//! ```text
//! METHOD & enc(scheme://host[:port]/path) & enc(k1=v1&k2=v2...)
//! ```
//!
//! Parameters are percent-encoded per RFC 3986 and sorted by encoded key,
//! then encoded value. The HMAC key is `enc(consumer_secret)&enc(token_secret)`
//! with an empty token secret before a token exists.
//!
//! Nonce and timestamp come from a [`Stamp`] so signing is reproducible in tests.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use sha1::Sha1;

use crate::account::ConsumerCredentials;
use crate::constants::{OAUTH_VERSION, SIGNATURE_METHOD};
use crate::error::{AuthError, Result};
use crate::token::AccessToken;

type HmacSha1 = Hmac<Sha1>;

/// Everything except RFC 3986 unreserved characters.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// RFC 3986 percent-encoding as OAuth requires (space is `%20`, never `+`).
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Nonce and timestamp for one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub nonce: String,
    /// Seconds since the unix epoch
    pub timestamp: u64,
}

impl Stamp {
    pub fn new(nonce: impl Into<String>, timestamp: u64) -> Self {
        Self {
            nonce: nonce.into(),
            timestamp,
        }
    }

    /// Fresh random nonce and the current wall-clock second.
    pub fn now() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            nonce: uuid::Uuid::new_v4().as_simple().to_string(),
            timestamp,
        }
    }
}

/// Output of [`Signer::sign`].
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Caller parameters plus all `oauth_*` parameters, including the signature.
    pub params: Vec<(String, String)>,
    /// `params` percent-encoded and sorted, ready for a query string or a
    /// form body.
    pub encoded: String,
    /// Caller headers with `Accept: application/json` added when missing.
    pub headers: HeaderMap,
}

impl SignedRequest {
    pub fn signature(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == "oauth_signature")
            .map(|(_, v)| v.as_str())
    }
}

/// Signs requests on behalf of one consumer application.
#[derive(Debug, Clone)]
pub struct Signer {
    consumer: ConsumerCredentials,
}

impl Signer {
    pub fn new(consumer: ConsumerCredentials) -> Self {
        Self { consumer }
    }

    /// Sign `method url` with the request `params`.
    ///
    /// `url` must not carry a query string; request parameters belong in
    /// `params`. `token` is `None` only for the password exchange.
    pub fn sign(
        &self,
        method: &Method,
        url: &str,
        params: &[(String, String)],
        token: Option<&AccessToken>,
        headers: HeaderMap,
        stamp: &Stamp,
    ) -> Result<SignedRequest> {
        let mut all = params.to_vec();
        all.push(("oauth_consumer_key".into(), self.consumer.key.clone()));
        all.push(("oauth_nonce".into(), stamp.nonce.clone()));
        all.push(("oauth_signature_method".into(), SIGNATURE_METHOD.into()));
        all.push(("oauth_timestamp".into(), stamp.timestamp.to_string()));
        if let Some(token) = token {
            all.push(("oauth_token".into(), token.token.clone()));
        }
        all.push(("oauth_version".into(), OAUTH_VERSION.into()));

        let base = base_string(method, url, &all)?;
        let signature = self.signature_for(&base, token.map(|t| t.secret.expose().as_str()))?;
        all.push(("oauth_signature".into(), signature));

        let encoded = normalize_params(&all);
        Ok(SignedRequest {
            params: all,
            encoded,
            headers: with_default_accept(headers),
        })
    }

    fn signature_for(&self, base: &str, token_secret: Option<&str>) -> Result<String> {
        let key = format!(
            "{}&{}",
            encode(self.consumer.secret.expose()),
            encode(token_secret.unwrap_or(""))
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| AuthError::Signing(format!("hmac key: {e}")))?;
        mac.update(base.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Build the signing base string for a request.
pub fn base_string(method: &Method, url: &str, params: &[(String, String)]) -> Result<String> {
    Ok(format!(
        "{}&{}&{}",
        method.as_str().to_ascii_uppercase(),
        encode(&normalize_url(url)?),
        encode(&normalize_params(params))
    ))
}

/// `scheme://host[:port]/path` with default ports dropped and no query.
fn normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| AuthError::InvalidUrl(format!("{url}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AuthError::InvalidUrl(format!("{url}: missing host")))?;

    let mut normalized = format!("{}://{}", parsed.scheme(), host.to_ascii_lowercase());
    // `Url::port` is None for the scheme's default port
    if let Some(port) = parsed.port() {
        normalized.push_str(&format!(":{port}"));
    }
    normalized.push_str(parsed.path());
    Ok(normalized)
}

fn normalize_params(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn with_default_accept(mut headers: HeaderMap) -> HeaderMap {
    if !headers.contains_key(ACCEPT) {
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    }
    headers
}
