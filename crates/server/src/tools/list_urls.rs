//! list_urls tool implementation.

use linkstash_core::{Error, UrlRecordView};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ingest::IngestService;

/// Parameters for the list_urls tool. Takes no arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListUrlsParams {}

/// Output from the list_urls tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListUrlsOutput {
    /// Every stored URL record.
    pub urls: Vec<UrlRecordView>,
}

/// Implementation of the list_urls tool.
pub async fn list_urls_impl(ingest: &IngestService, _params: ListUrlsParams) -> Result<CallToolResult, McpError> {
    let output = ListUrlsOutput { urls: ingest.list_urls().await? };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
