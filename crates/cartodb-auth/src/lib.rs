//! CartoDB OAuth authentication library
//!
//! Provides OAuth 1.0a request signing, the xAuth password exchange, and the
//! per-namespace token cache used by the CartoDB client. This crate has no
//! dependency on the request pipeline and can be tested on its own.
//!
//! Credential flow:
//! 1. Client looks up a token via `credentials::TokenCache::load()`
//! 2. On a miss, `token::acquire()` exchanges email/password for a token pair
//! 3. The new token is persisted via `credentials::TokenCache::save()`
//! 4. Every resource request is signed with `signer::Signer::sign()`
//! 5. On a 401 the client repeats steps 2-3 once and retries

pub mod account;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod signer;
pub mod token;

pub use account::{AccountContext, ConsumerCredentials, Endpoints, Namespace};
pub use constants::*;
pub use credentials::TokenCache;
pub use error::{AuthError, Result};
pub use signer::{SignedRequest, Signer, Stamp, encode};
pub use token::{AccessToken, acquire, parse_token_response};
