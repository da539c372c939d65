//! CartoDB API client
//!
//! `CartoClient` signs every resource request with the account's OAuth token,
//! transparently re-authenticates once when the server answers 401, and
//! exposes the SQL, table, record and visualization endpoints on top of that
//! pipeline.
//!
//! ```no_run
//! # async fn demo() -> cartodb_client::Result<()> {
//! use cartodb_auth::{AccountContext, ConsumerCredentials, Namespace};
//! use cartodb_client::{CartoClient, ClientConfig};
//!
//! let config = ClientConfig::new(
//!     ConsumerCredentials::new("key", "secret"),
//!     AccountContext::new(Namespace::new("acme")?, "ops@acme.test", "password"),
//! );
//! let client = CartoClient::connect(config).await?;
//! let rows = client.run_sql("SELECT count(*) FROM cities").await?;
//! println!("{:?}", rows.get("rows"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod sql;
pub mod tables;

#[cfg(test)]
mod test_support;

pub use client::CartoClient;
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use error::{ApiError, Result};
pub use request::RequestSpec;
pub use response::{ResponseBody, ResponseEnvelope};
pub use sql::{delete_row_sql, insert_row_sql, update_row_sql};
pub use tables::RecordsPage;
