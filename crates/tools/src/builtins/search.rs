//! `search_web` — query a configured primary search provider with automatic
//! failover to a secondary, grounded on the generic Brave-style JSON
//! search API.

use std::sync::Arc;
use std::time::Duration;

use lop_domain::config::ProviderEndpoint;

use crate::builtins::resolve_endpoint_key;
use crate::registry::{Tool, ToolParam, ToolSignature};

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, serde::Serialize)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

async fn query_provider(
    endpoint: &ProviderEndpoint,
    query: &str,
    engine: &str,
    max_results: usize,
) -> Result<Vec<SearchHit>, String> {
    let client = reqwest::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| format!("failed to build http client: {e}"))?;

    let mut req = client.get(&endpoint.base_url).query(&[
        ("q", query),
        ("engine", engine),
        ("count", &max_results.to_string()),
    ]);
    if let Some(key) = resolve_endpoint_key(endpoint) {
        req = req.header("Authorization", format!("Bearer {key}"));
    }

    let resp = req
        .send()
        .await
        .map_err(|e| format!("search request to {} failed: {e}", endpoint.base_url))?;

    if !resp.status().is_success() {
        return Err(format!("search provider returned HTTP {}", resp.status()));
    }

    let json: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| format!("failed to parse search response: {e}"))?;

    let results = json["results"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .take(max_results)
        .map(|item| SearchHit {
            title: item["title"].as_str().unwrap_or_default().to_string(),
            url: item["url"].as_str().unwrap_or_default().to_string(),
            snippet: item["snippet"].as_str().unwrap_or_default().to_string(),
        })
        .collect();

    Ok(results)
}

pub fn search_web_tool(
    primary: Option<ProviderEndpoint>,
    secondary: Option<ProviderEndpoint>,
) -> Tool {
    Tool::new(
        ToolSignature {
            name: "search_web".into(),
            params: vec![
                ToolParam::new("query", "string"),
                ToolParam::new("engine", "string"),
                ToolParam::new("max_results", "integer"),
            ],
            returns: "results".into(),
            suspending: true,
            summary: "search the web, failing over from the primary to the secondary provider"
                .into(),
        },
        Arc::new(move |args| {
            let primary = primary.clone();
            let secondary = secondary.clone();
            Box::pin(async move {
                let query = args
                    .get("query")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing required param: query".to_string())?
                    .to_string();
                let engine = args
                    .get("engine")
                    .and_then(|v| v.as_str())
                    .unwrap_or("google")
                    .to_string();
                let max_results = args
                    .get("max_results")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(20) as usize;

                let primary = primary.ok_or_else(|| "no search provider configured".to_string())?;

                let hits = match query_provider(&primary, &query, &engine, max_results).await {
                    Ok(hits) => hits,
                    Err(primary_err) => {
                        let Some(ref secondary) = secondary else {
                            return Err(primary_err);
                        };
                        query_provider(secondary, &query, &engine, max_results)
                            .await
                            .map_err(|secondary_err| {
                                format!(
                                    "primary search failed ({primary_err}); secondary also failed ({secondary_err})"
                                )
                            })?
                    }
                };

                serde_json::to_value(&hits).map_err(|e| format!("failed to encode results: {e}"))
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_web_requires_query() {
        let tool = search_web_tool(
            Some(ProviderEndpoint {
                base_url: "http://127.0.0.1:1".into(),
                ..Default::default()
            }),
            None,
        );
        let result = tool.call(serde_json::json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn search_web_without_any_provider_errors() {
        let tool = search_web_tool(None, None);
        let result = tool.call(serde_json::json!({"query": "rust"})).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("no search provider"));
    }
}
