//! Common types shared by the CartoDB client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
