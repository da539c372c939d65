//! CartoDB command-line client
//!
//! Loads account and consumer settings, authenticates (reusing the cached
//! token when there is one), runs a single API command and prints the
//! response body to stdout. Logs go to stderr as JSON.

mod command;
mod config;

use anyhow::{Context, Result};
use cartodb_client::{CartoClient, ResponseBody};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::USAGE;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        return Ok(());
    }
    let invocation =
        command::parse(&args).with_context(|| format!("invalid arguments\n\n{USAGE}"))?;

    let config_path = Config::resolve_path(invocation.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let client_config = config
        .client_config()
        .context("incomplete client configuration")?;

    info!(
        namespace = %client_config.account.namespace,
        token_url = client_config.endpoints.access_token_url(),
        cache_dir = %client_config.cache.dir().display(),
        "configuration loaded"
    );

    let client = CartoClient::new(client_config).context("failed to build client")?;
    if let Some(response) = command::run(&client, invocation.command).await? {
        print_body(&response.body)?;
    }
    Ok(())
}

fn print_body(body: &ResponseBody) -> Result<()> {
    match body {
        ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        ResponseBody::Raw(text) => println!("{text}"),
    }
    Ok(())
}
