//! `get_page_html_content` / `get_page_text_content` — fetch a page and
//! return either its raw HTML or extracted readable text.
//!
//! The spec calls for a headless-browser fetch so JS-rendered pages come
//! through; no such dependency exists in this workspace, so both tools
//! fetch over plain HTTP and document the gap rather than silently
//! pretending to render JavaScript (see DESIGN.md).

use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::registry::{Tool, ToolParam, ToolSignature};

const USER_AGENT: &str = "lop-tools/0.1";
const TIMEOUT: Duration = Duration::from_secs(15);
const MAX_DOWNLOAD_BYTES: usize = 512_000;

fn client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("failed to build http client: {e}"))
}

async fn fetch(url: &str) -> Result<String, String> {
    let resp = client()?
        .get(url)
        .header("Accept", "text/html")
        .send()
        .await
        .map_err(|e| format!("request to {url} failed: {e}"))?;

    if !resp.status().is_success() {
        return Err(format!("{url} returned HTTP {}", resp.status()));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| format!("failed to read response body: {e}"))?;

    Ok(if body.len() > MAX_DOWNLOAD_BYTES {
        let boundary = floor_char_boundary(&body, MAX_DOWNLOAD_BYTES);
        body[..boundary].to_string()
    } else {
        body
    })
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Elements whose text content contributes to the readable-text extraction,
/// selected together so matches come back in document order.
const TEXT_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, td, th, figcaption";

fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse(TEXT_SELECTOR) else {
        return String::new();
    };
    doc.select(&sel)
        .filter_map(|el| {
            let text: String = el.text().collect();
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!collapsed.is_empty()).then_some(collapsed)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn get_page_html_content_tool() -> Tool {
    Tool::new(
        ToolSignature {
            name: "get_page_html_content".into(),
            params: vec![ToolParam::new("url", "string")],
            returns: "string".into(),
            suspending: true,
            summary: "fetch a page's HTML".into(),
        },
        Arc::new(|args| {
            Box::pin(async move {
                let url = args
                    .get("url")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing required param: url".to_string())?;
                let html = fetch(url).await?;
                Ok(serde_json::Value::String(html))
            })
        }),
    )
}

pub fn get_page_text_content_tool() -> Tool {
    Tool::new(
        ToolSignature {
            name: "get_page_text_content".into(),
            params: vec![ToolParam::new("url", "string")],
            returns: "string".into(),
            suspending: true,
            summary: "fetch a page and extract its readable text".into(),
        },
        Arc::new(|args| {
            Box::pin(async move {
                let url = args
                    .get("url")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing required param: url".to_string())?;
                let html = fetch(url).await?;
                Ok(serde_json::Value::String(extract_text(&html)))
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_pulls_semantic_elements_only() {
        let html = r#"<html><body>
            <nav>skip this</nav>
            <h1>Title</h1>
            <p>First   paragraph.</p>
            <ul><li>item one</li><li>item two</li></ul>
        </body></html>"#;
        let text = extract_text(html);
        assert!(text.contains("Title"));
        assert!(text.contains("First paragraph."));
        assert!(text.contains("item one"));
        assert!(!text.contains("skip this"));
    }

    #[test]
    fn extract_text_collapses_whitespace() {
        let html = "<p>a\n   b\t  c</p>";
        assert_eq!(extract_text(html), "a b c");
    }

    #[tokio::test]
    async fn get_page_html_content_requires_url() {
        let tool = get_page_html_content_tool();
        let result = tool.call(serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
