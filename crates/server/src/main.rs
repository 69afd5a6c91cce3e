//! linkstash server entry point.
//!
//! Boots the MCP server on stdio transport and the background refetch loop.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use linkstash_client::{FetchClient, FetchConfig};
use linkstash_core::{AppConfig, SqliteStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod ingest;
mod refetch;
#[cfg(test)]
mod testing;
mod tools;

use ingest::IngestService;
use refetch::{RefetchConfig, Refetcher};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), "Starting linkstash server on stdio transport");

    let store = Arc::new(SqliteStore::open(&config.db_path).await?);
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let refetch = Arc::new(Refetcher::new(fetcher.clone(), store.clone(), RefetchConfig::from(&config))).spawn();

    let handler = handler::LinkstashServer::new(Arc::new(IngestService::new(fetcher, store)));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    let served = server.waiting().await;
    refetch.stop().await;
    served?;

    Ok(())
}
