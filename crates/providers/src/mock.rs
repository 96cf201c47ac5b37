//! A scriptable [`LlmProvider`] used by executor/gateway tests and examples.
//! Concrete wire adapters are out of scope for this crate; anything that
//! needs a real model plugs in its own `LlmProvider` impl the same way this
//! one does.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lop_domain::capability::{LlmCapabilities, ToolSupport};
use lop_domain::error::Result;
use lop_domain::stream::{BoxStream, StreamEvent, Usage};
use parking_lot::Mutex;

use crate::traits::{ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse, LlmProvider};

/// Replays a fixed queue of responses, one per `chat`/`chat_stream` call,
/// repeating the last entry once exhausted.
pub struct MockProvider {
    id: String,
    capabilities: LlmCapabilities,
    responses: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockProvider {
    pub fn new(id: impl Into<String>, responses: Vec<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: LlmCapabilities {
                supports_tools: ToolSupport::Basic,
                supports_streaming: true,
                supports_json_mode: true,
                supports_vision: false,
                context_window_tokens: Some(128_000),
                max_output_tokens: Some(4096),
            },
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> String {
        let responses = self.responses.lock();
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        responses
            .get(idx)
            .or_else(|| responses.last())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: self.next_response(),
            tool_calls: Vec::new(),
            usage: Some(Usage {
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
            }),
            model: self.id.clone(),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn chat_stream(
        &self,
        _req: ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let text = self.next_response();
        let stream = async_stream::stream! {
            yield Ok(StreamEvent::Token { text });
            yield Ok(StreamEvent::Done { usage: None, finish_reason: Some("stop".into()) });
        };
        Ok(Box::pin(stream))
    }

    async fn embeddings(&self, req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        Ok(EmbeddingsResponse {
            embeddings: req.input.iter().map(|_| vec![0.0_f32; 8]).collect(),
        })
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queued_responses_then_repeats_last() {
        let provider = MockProvider::new("mock", vec!["first".into(), "second".into()]);
        let r1 = provider.chat(ChatRequest::default()).await.unwrap();
        let r2 = provider.chat(ChatRequest::default()).await.unwrap();
        let r3 = provider.chat(ChatRequest::default()).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
        assert_eq!(r3.content, "second");
    }
}
