//! Normalized response handed back to callers

use reqwest::header::HeaderMap;
use serde_json::Value;

/// Response body, JSON-decoded when decoding is enabled and the body parses.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(String),
}

impl ResponseBody {
    /// Decode `bytes`. Bodies that are not valid JSON stay raw rather than
    /// being replaced by an empty value.
    pub fn decode(bytes: &[u8], decode_json: bool) -> Self {
        if decode_json {
            if let Ok(value) = serde_json::from_slice(bytes) {
                return ResponseBody::Json(value);
            }
        }
        ResponseBody::Raw(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// JSON view of the body, parsing a raw body on demand.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value.clone()),
            ResponseBody::Raw(text) => serde_json::from_str(text).ok(),
        }
    }
}

/// `{body, status, headers}` of a successful call.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub body: ResponseBody,
    pub status: u16,
    pub headers: HeaderMap,
}

impl ResponseEnvelope {
    /// Top-level field of a JSON object body.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.as_json().and_then(|v| v.get(key))
    }
}
