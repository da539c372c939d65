//! Access token acquisition (xAuth password exchange)
//!
//! The client trades the account email/password for an OAuth token pair by
//! POSTing a consumer-signed request to `/oauth/access_token` with
//! `x_auth_mode=client_auth`. The endpoint answers with a form-encoded body
//! (`oauth_token=...&oauth_token_secret=...`), not JSON.
//!
//! The caller is responsible for persisting the returned token via
//! `TokenCache::save` before using it.

use common::Secret;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::{AccountContext, Endpoints};
use crate::constants::X_AUTH_MODE;
use crate::error::{AuthError, Result};
use crate::signer::{Signer, Stamp};

/// OAuth token pair used to sign resource requests.
///
/// Field names follow the token endpoint's wire names so the same type
/// deserializes from the form-encoded response and from the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "oauth_token")]
    pub token: String,
    #[serde(rename = "oauth_token_secret")]
    pub secret: Secret<String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, secret: impl Into<Secret<String>>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

/// Exchange the account credentials for a new access token.
///
/// Any status other than 200 is `Rejected` with the raw body; failures to
/// reach the endpoint are `Unreachable`. Nothing is retried here.
pub async fn acquire(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    signer: &Signer,
    account: &AccountContext,
) -> Result<AccessToken> {
    let url = endpoints.access_token_url();
    let params = vec![
        ("x_auth_username".to_string(), account.email.clone()),
        ("x_auth_password".to_string(), account.password.expose().clone()),
        ("x_auth_mode".to_string(), X_AUTH_MODE.to_string()),
    ];

    // The endpoint replies form-encoded; don't advertise JSON.
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    let signed = signer.sign(&Method::POST, url, &params, None, headers, &Stamp::now())?;

    debug!(namespace = %account.namespace, url, "requesting access token");

    let response = client
        .post(url)
        .headers(signed.headers)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(signed.encoded)
        .send()
        .await
        .map_err(|e| AuthError::Unreachable(format!("access token request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::Unreachable(format!("reading access token response: {e}")))?;

    if status != StatusCode::OK {
        warn!(
            namespace = %account.namespace,
            status = status.as_u16(),
            "access token request rejected"
        );
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let token = parse_token_response(&body)?;
    info!(namespace = %account.namespace, "acquired access token");
    Ok(token)
}

/// Parse a `key=value&key=value` token response. Unknown keys are ignored.
pub fn parse_token_response(body: &str) -> Result<AccessToken> {
    let token: AccessToken = serde_urlencoded::from_str(body.trim())
        .map_err(|e| AuthError::MalformedToken(format!("{e}")))?;
    if token.token.is_empty() || token.secret.expose().is_empty() {
        return Err(AuthError::MalformedToken(
            "oauth_token and oauth_token_secret must be non-empty".into(),
        ));
    }
    Ok(token)
}
