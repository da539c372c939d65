//! In-process mock of the CartoDB token endpoint and resource API.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cartodb_auth::signer::base_string;
use cartodb_auth::{AccountContext, ConsumerCredentials, Endpoints, Namespace, TokenCache, encode};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use tokio::net::TcpListener;

use crate::{CartoClient, ClientConfig};

const CONSUMER_KEY: &str = "K";
const CONSUMER_SECRET: &str = "S";

/// A resource request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    /// Query string and form body parameters, in that order.
    pub params: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
}

impl Recorded {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct MockState {
    /// Issued tokens are `T{n}` / `TS{n}` with n counting from 1.
    token_hits: AtomicUsize,
    token_status: Mutex<Option<(u16, String)>>,
    /// Requests signed with any of these tokens get a 401, as do requests
    /// whose HMAC-SHA1 signature does not verify.
    stale_tokens: Mutex<HashSet<String>>,
    /// Scripted `(status, body)` replies, consumed in order; `(200, "{}")`
    /// once empty. Routed replies take precedence for their path.
    script: Mutex<VecDeque<(u16, String)>>,
    routes: Mutex<Vec<(String, String, u16, String)>>,
    requests: Mutex<Vec<Recorded>>,
}

#[derive(Clone)]
pub struct MockApi {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let base_url = format!("http://{addr}");

        let handler_state = state.clone();
        let handler_base = base_url.clone();
        let app = axum::Router::new().fallback(move |request: Request<Body>| {
            let state = handler_state.clone();
            let base_url = handler_base.clone();
            async move { handle(state, base_url, request).await }
        });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, state }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from_base(&self.base_url)
    }

    /// Queue replies for the next resource requests.
    pub fn script(&self, replies: &[(u16, &str)]) {
        let mut script = self.state.script.lock().unwrap();
        for (status, body) in replies {
            script.push_back((*status, body.to_string()));
        }
    }

    /// Always answer `method path` with this reply.
    pub fn route(&self, method: &str, path: &str, status: u16, body: &str) {
        self.state.routes.lock().unwrap().push((
            method.to_string(),
            path.to_string(),
            status,
            body.to_string(),
        ));
    }

    /// Make the token endpoint fail with this reply.
    pub fn reject_token_requests(&self, status: u16, body: &str) {
        *self.state.token_status.lock().unwrap() = Some((status, body.to_string()));
    }

    pub fn mark_stale(&self, token: &str) {
        self.state.stale_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn token_hits(&self) -> usize {
        self.state.token_hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(state: Arc<MockState>, base_url: String, request: Request<Body>) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("").to_string();
    let content_type = header(request.headers(), "content-type");
    let accept = header(request.headers(), "accept");
    let body = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .unwrap();

    let mut params: Vec<(String, String)> = serde_urlencoded::from_str(&query).unwrap();
    let form: Vec<(String, String)> = serde_urlencoded::from_bytes(&body).unwrap_or_default();
    params.extend(form);

    if path == "/oauth/access_token" {
        if let Some((status, body)) = state.token_status.lock().unwrap().clone() {
            return reply(status, body);
        }
        if !signature_matches(&method, &format!("{base_url}{path}"), &params, "") {
            return reply(401, "invalid signature".to_string());
        }
        let n = state.token_hits.fetch_add(1, Ordering::SeqCst) + 1;
        return reply(200, format!("oauth_token=T{n}&oauth_token_secret=TS{n}&user_id=1"));
    }

    let recorded = Recorded {
        method: method.clone(),
        path: path.clone(),
        params,
        content_type,
        accept,
    };
    let token = recorded.param("oauth_token").map(str::to_string);
    let signed = token.as_deref().is_some_and(|token| {
        signature_matches(
            &method,
            &format!("{base_url}{path}"),
            &recorded.params,
            &secret_for(token),
        )
    });
    state.requests.lock().unwrap().push(recorded);

    let stale = token
        .as_ref()
        .is_some_and(|t| state.stale_tokens.lock().unwrap().contains(t));
    if stale {
        return reply(401, r#"{"error":"invalid token"}"#.to_string());
    }
    if !signed {
        return reply(401, r#"{"error":"invalid signature"}"#.to_string());
    }

    let routed = state
        .routes
        .lock()
        .unwrap()
        .iter()
        .find(|(m, p, _, _)| *m == method && *p == path)
        .map(|(_, _, status, body)| (*status, body.clone()));
    if let Some((status, body)) = routed {
        return reply(status, body);
    }

    let (status, body) = state
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, "{}".to_string()));
    reply(status, body)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Token secret the mock associates with `token`: `T{n}` pairs with `TS{n}`.
fn secret_for(token: &str) -> String {
    format!("TS{}", token.strip_prefix('T').unwrap_or(token))
}

/// Recompute the HMAC-SHA1 signature with consumer secret `S` and compare it
/// to the `oauth_signature` the client sent.
fn signature_matches(
    method: &str,
    url: &str,
    params: &[(String, String)],
    token_secret: &str,
) -> bool {
    let Some(sent) = params
        .iter()
        .find(|(k, _)| k == "oauth_signature")
        .map(|(_, v)| v.clone())
    else {
        return false;
    };
    let unsigned: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "oauth_signature")
        .cloned()
        .collect();
    let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap();
    let base = base_string(&method, url, &unsigned).unwrap();

    let key = format!("{}&{}", encode(CONSUMER_SECRET), encode(token_secret));
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).unwrap();
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes()) == sent
}

fn reply(status: u16, body: String) -> Response {
    (
        StatusCode::from_u16(status).unwrap(),
        [("x-mock", "cartodb")],
        body,
    )
        .into_response()
}

/// Client for namespace `acme` pointed at `mock`, caching tokens in `cache_dir`.
pub fn client_for(mock: &MockApi, cache_dir: &Path) -> CartoClient {
    CartoClient::new(config_for(mock, cache_dir)).unwrap()
}

pub fn config_for(mock: &MockApi, cache_dir: &Path) -> ClientConfig {
    ClientConfig::new(
        ConsumerCredentials::new(CONSUMER_KEY, CONSUMER_SECRET),
        AccountContext::new(acme(), "ops@acme.test", "pass"),
    )
    .with_endpoints(mock.endpoints())
    .with_cache(TokenCache::new(cache_dir))
}

pub fn acme() -> Namespace {
    Namespace::new("acme").unwrap()
}
