//! Provider registry.
//!
//! Concrete LLM adapters (OpenAI-compat, Anthropic, Google, Bedrock, ...) are
//! out of scope here — this registry only holds whatever [`LlmProvider`]
//! trait objects the embedding application registers, keyed by provider id,
//! plus one optional default used when a request doesn't name a provider.

use std::collections::HashMap;
use std::sync::Arc;

use lop_domain::error::{Error, Result};

use crate::traits::LlmProvider;

/// Holds instantiated LLM providers, addressable by id.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default_provider: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own [`LlmProvider::provider_id`]. The
    /// first provider registered becomes the default.
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        let id = provider.provider_id().to_string();
        if self.default_provider.is_none() {
            self.default_provider = Some(id.clone());
        }
        self.providers.insert(id, provider);
    }

    pub fn set_default(&mut self, provider_id: impl Into<String>) {
        self.default_provider = Some(provider_id.into());
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Resolve a provider: an explicit id if given, else the registered
    /// default.
    pub fn resolve(&self, provider_id: Option<&str>) -> Result<Arc<dyn LlmProvider>> {
        let id = provider_id
            .map(str::to_string)
            .or_else(|| self.default_provider.clone())
            .ok_or_else(|| Error::Config("no LLM provider configured".into()))?;
        self.get(&id)
            .ok_or_else(|| Error::Config(format!("unknown provider '{id}'")))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use lop_domain::capability::LlmCapabilities;
    use lop_domain::stream::{BoxStream, StreamEvent};

    use super::*;
    use crate::traits::{ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse};

    struct StubProvider(&'static str);

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
            unimplemented!()
        }

        async fn chat_stream(
            &self,
            _req: ChatRequest,
        ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
            unimplemented!()
        }

        async fn embeddings(&self, _req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
            unimplemented!()
        }

        fn capabilities(&self) -> &LlmCapabilities {
            unimplemented!()
        }

        fn provider_id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn first_registered_becomes_default() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider("alpha")));
        registry.register(Arc::new(StubProvider("beta")));
        let resolved = registry.resolve(None).unwrap();
        assert_eq!(resolved.provider_id(), "alpha");
    }

    #[test]
    fn resolve_unknown_provider_errors() {
        let registry = ProviderRegistry::new();
        assert!(registry.resolve(Some("nope")).is_err());
    }
}
