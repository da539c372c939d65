//! Authenticated request pipeline
//!
//! Every call runs the same bounded state machine:
//!
//! ```text
//! Signed -> send -> 2xx        -> Ok(envelope)
//!                -> other      -> Err(RequestFailed)
//!                -> 401        -> Reauthorizing -> Signed (once)
//!                -> 401 again  -> Err(AuthFailed)
//! ```
//!
//! The access token lives behind a tokio Mutex. Signing takes the lock only
//! long enough to clone the token; re-authorization holds it across the
//! password exchange and the cache write, so concurrent callers wait for the
//! new token instead of signing with the one that was just rejected.

use cartodb_auth::{
    AccessToken, AccountContext, Endpoints, Signer, Stamp, TokenCache,
};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::request::RequestSpec;
use crate::response::{ResponseBody, ResponseEnvelope};

/// Re-authentications allowed within a single call.
const MAX_REAUTHORIZATIONS: u32 = 1;

/// Status, headers and undecoded body of one HTTP exchange.
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// CartoDB API client for one account.
pub struct CartoClient {
    http: reqwest::Client,
    signer: Signer,
    account: AccountContext,
    endpoints: Endpoints,
    cache: TokenCache,
    decode_json: bool,
    token: Mutex<Option<AccessToken>>,
}

impl CartoClient {
    /// Build a client without touching the network or the cache. The token
    /// is loaded (or acquired) on first use.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            warn!(
                namespace = %config.account.namespace,
                "TLS certificate verification disabled"
            );
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ApiError::Config(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            signer: Signer::new(config.consumer),
            account: config.account,
            endpoints: config.endpoints,
            cache: config.cache,
            decode_json: config.decode_json,
            token: Mutex::new(None),
        })
    }

    /// Build a client and make sure it holds a token, either from the cache
    /// or from a fresh password exchange.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.current_token().await?;
        Ok(client)
    }

    /// Whether a token is currently held in memory.
    pub async fn is_authorized(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// Forget the token in memory and on disk. The next call re-authenticates.
    pub async fn logout(&self) -> Result<()> {
        let mut token = self.token.lock().await;
        *token = None;
        self.cache.remove(&self.account.namespace).await?;
        info!(namespace = %self.account.namespace, "logged out");
        Ok(())
    }

    /// Sign and send `spec`, re-authenticating at most once on a 401.
    #[instrument(skip_all, fields(method = %spec.method, path = %spec.path))]
    pub async fn execute(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        let url = self.endpoints.resource_url(&spec.path);
        let mut token = self.current_token().await?;
        let mut reauthorizations = 0;

        loop {
            let response = self.send(&spec, &url, &token).await?;
            let status = response.status;
            metrics::counter!(
                "cartodb_requests_total",
                "method" => spec.method.to_string(),
                "status" => status.as_u16().to_string()
            )
            .increment(1);

            if status == StatusCode::UNAUTHORIZED {
                if reauthorizations >= MAX_REAUTHORIZATIONS {
                    warn!("request unauthorized after re-authentication");
                    return Err(ApiError::AuthFailed {
                        reason: "request still unauthorized after re-authentication".into(),
                        source: None,
                    });
                }
                reauthorizations += 1;
                debug!("token rejected, re-authenticating");
                token = self.reauthorize(&token).await.map_err(|e| match e {
                    ApiError::Auth(source) => ApiError::AuthFailed {
                        reason: "re-authentication failed".into(),
                        source: Some(source),
                    },
                    other => other,
                })?;
                continue;
            }

            if !status.is_success() {
                debug!(status = status.as_u16(), "request failed");
                return Err(ApiError::RequestFailed {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&response.body).into_owned(),
                });
            }

            return Ok(ResponseEnvelope {
                body: ResponseBody::decode(&response.body, self.decode_json),
                status: status.as_u16(),
                headers: response.headers,
            });
        }
    }

    async fn send(&self, spec: &RequestSpec, url: &str, token: &AccessToken) -> Result<RawResponse> {
        let signed = self.signer.sign(
            &spec.method,
            url,
            &spec.params,
            Some(token),
            spec.headers.clone(),
            &Stamp::now(),
        )?;

        let request = if spec.params_in_query() {
            self.http
                .request(spec.method.clone(), format!("{url}?{}", signed.encoded))
        } else {
            self.http
                .request(spec.method.clone(), url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(signed.encoded)
        };

        let response = request
            .headers(signed.headers)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{} {url}: {e}", spec.method)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("reading response body: {e}")))?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    /// Token for signing: in memory, else cached on disk, else acquired.
    async fn current_token(&self) -> Result<AccessToken> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        let token = match self.cache.load(&self.account.namespace).await {
            Some(token) => token,
            None => self.acquire_and_persist().await?,
        };
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Replace `rejected` with a freshly acquired token.
    ///
    /// If another caller already replaced it while we waited for the lock,
    /// that newer token is returned without a second exchange.
    async fn reauthorize(&self, rejected: &AccessToken) -> Result<AccessToken> {
        let mut guard = self.token.lock().await;
        if let Some(current) = guard.as_ref() {
            if current != rejected {
                debug!("token already replaced by a concurrent call");
                return Ok(current.clone());
            }
        }

        metrics::counter!("cartodb_reauthorizations_total").increment(1);
        let token = self.acquire_and_persist().await?;
        *guard = Some(token.clone());
        info!(namespace = %self.account.namespace, "re-authenticated");
        Ok(token)
    }

    /// Password exchange followed by a mandatory cache write.
    async fn acquire_and_persist(&self) -> Result<AccessToken> {
        let token =
            cartodb_auth::acquire(&self.http, &self.endpoints, &self.signer, &self.account).await?;
        self.cache.save(&self.account.namespace, &token).await?;
        Ok(token)
    }
}
