//! Per-call request description built by the API methods

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// One resource request: path under `/api/v1/`, method, parameters, headers.
///
/// Consumed by `CartoClient::execute`; the same spec is replayed verbatim if
/// the first attempt has to be re-authorized.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub path: String,
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            params: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Whether parameters travel in the query string rather than a form body.
    pub(crate) fn params_in_query(&self) -> bool {
        self.method == Method::GET || self.method == Method::DELETE
    }
}
