//! store_urls tool implementation.
//!
//! Stores a batch of URLs, fetching the ones not seen before.

use linkstash_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ingest::IngestService;

/// Parameters for the store_urls tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreUrlsParams {
    /// URLs to store. Known URLs are answered from the store without a new fetch.
    pub urls: Vec<String>,
}

/// Implementation of the store_urls tool.
pub async fn store_urls_impl(ingest: &IngestService, params: StoreUrlsParams) -> Result<CallToolResult, McpError> {
    let output = ingest.store_urls(&params.urls).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::StoreUrlsOutput;
    use crate::testing::StubFetcher;
    use linkstash_client::FetchError;
    use linkstash_core::SqliteStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_store_urls_partitions_results() {
        let fetcher = Arc::new(StubFetcher::default());
        fetcher.set_ok("https://example.com/", "<p>ok</p>");
        fetcher.set_error("https://gone.example/", FetchError::HttpStatus(410));
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let ingest = IngestService::new(fetcher, store);

        let params =
            StoreUrlsParams { urls: vec!["https://example.com/".to_string(), "https://gone.example/".to_string()] };

        let result = store_urls_impl(&ingest, params).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: StoreUrlsOutput = serde_json::from_str(text).unwrap();
        assert_eq!(output.success.len(), 1);
        assert_eq!(output.success[0].content.as_deref(), Some("<p>ok</p>"));
        assert_eq!(output.failed.len(), 1);
        assert_eq!(output.failed[0].url, "https://gone.example/");
    }

    #[tokio::test]
    async fn test_store_urls_empty_list() {
        let fetcher = Arc::new(StubFetcher::default());
        let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let ingest = IngestService::new(fetcher, store);

        let result = store_urls_impl(&ingest, StoreUrlsParams { urls: vec![] }).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val.get("text").and_then(|v| v.as_str()).unwrap();
        let output: StoreUrlsOutput = serde_json::from_str(text).unwrap();
        assert!(output.success.is_empty());
        assert!(output.failed.is_empty());
    }
}
