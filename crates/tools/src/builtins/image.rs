//! `generate_image` / `generate_altered_image` — image synthesis/alteration
//! against a configured provider endpoint. Specified by contract only: any
//! provider returning `{ "image_base64": "..." }` or `{ "image_url": "..." }`
//! satisfies it.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use lop_domain::config::ProviderEndpoint;

use crate::builtins::resolve_endpoint_key;
use crate::registry::{Tool, ToolParam, ToolSignature};

const TIMEOUT: Duration = Duration::from_secs(60);

async fn post_image_request(
    endpoint: &ProviderEndpoint,
    body: serde_json::Value,
) -> Result<serde_json::Value, String> {
    let client = reqwest::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| format!("failed to build http client: {e}"))?;

    let mut req = client.post(&endpoint.base_url).json(&body);
    if let Some(key) = resolve_endpoint_key(endpoint) {
        req = req.header("Authorization", format!("Bearer {key}"));
    }

    let resp = req
        .send()
        .await
        .map_err(|e| format!("image request to {} failed: {e}", endpoint.base_url))?;

    if !resp.status().is_success() {
        return Err(format!("image provider returned HTTP {}", resp.status()));
    }

    resp.json()
        .await
        .map_err(|e| format!("failed to parse image response: {e}"))
}

pub fn generate_image_tool(endpoint: ProviderEndpoint) -> Tool {
    Tool::new(
        ToolSignature {
            name: "generate_image".into(),
            params: vec![ToolParam::new("prompt", "string")],
            returns: "{ image_url | image_base64 }".into(),
            suspending: true,
            summary: "synthesize an image from a text prompt".into(),
        },
        Arc::new(move |args| {
            let endpoint = endpoint.clone();
            Box::pin(async move {
                let prompt = args
                    .get("prompt")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing required param: prompt".to_string())?;
                post_image_request(&endpoint, serde_json::json!({ "prompt": prompt })).await
            })
        }),
    )
}

pub fn generate_altered_image_tool(endpoint: ProviderEndpoint) -> Tool {
    Tool::new(
        ToolSignature {
            name: "generate_altered_image".into(),
            params: vec![
                ToolParam::new("image_path", "string"),
                ToolParam::new("prompt", "string"),
            ],
            returns: "{ image_url | image_base64 }".into(),
            suspending: true,
            summary: "alter an existing image according to a text prompt".into(),
        },
        Arc::new(move |args| {
            let endpoint = endpoint.clone();
            Box::pin(async move {
                let image_path = args
                    .get("image_path")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing required param: image_path".to_string())?;
                let prompt = args
                    .get("prompt")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing required param: prompt".to_string())?;

                let image_bytes = tokio::fs::read(image_path)
                    .await
                    .map_err(|e| format!("failed to read '{image_path}': {e}"))?;
                let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_bytes);

                post_image_request(
                    &endpoint,
                    serde_json::json!({ "prompt": prompt, "image_base64": image_base64 }),
                )
                .await
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_image_requires_prompt() {
        let tool = generate_image_tool(ProviderEndpoint {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        });
        let result = tool.call(serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
