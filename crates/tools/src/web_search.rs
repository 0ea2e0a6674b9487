//! Web search tool — stub that returns mock search results.
//!
//! In production this would call a real search API (Brave, Tavily, etc.).
//! The stub returns deterministic, plausible results so the dispatch loop
//! and delegation router can be exercised end-to-end without network access.

use async_trait::async_trait;
use serde::Serialize;

use switchboard_core::error::ToolError;
use switchboard_core::tool::Tool;

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns a list of relevant results with titles, URLs, and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 3)",
                    "default": 3
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let num_results = arguments["num_results"].as_u64().unwrap_or(3).min(5) as usize;
        let results = mock_results(query, num_results);

        Ok(serde_json::json!({
            "query": query,
            "results": results,
            "note": "Stub implementation; integrate a real search API for live results.",
        }))
    }
}

#[derive(Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

fn mock_results(query: &str, count: usize) -> Vec<SearchResult> {
    (1..=count)
        .map(|i| SearchResult {
            title: format!("Search result {i} for: {query}"),
            url: format!("https://example.com/result{i}"),
            snippet: format!("Relevant information about '{query}' (result {i})."),
        })
        .collect()
}
