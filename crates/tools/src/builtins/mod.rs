//! Built-in tools registered by [`crate::build_registry`], gated on the
//! provider configuration each one depends on.

mod fs_list;
mod image;
mod search;
mod web;
mod wsl;

use lop_domain::config::ToolProviderConfig;

use crate::registry::ToolRegistry;

/// Populate a fresh registry with every built-in whose provider dependency
/// (if any) is configured.
pub fn register_all(registry: &ToolRegistry, providers: &ToolProviderConfig) {
    registry.add("get_page_html_content", web::get_page_html_content_tool());
    registry.add("get_page_text_content", web::get_page_text_content_tool());
    registry.add("list_working_directory", fs_list::list_working_directory_tool());

    if providers.search_primary.is_some() {
        registry.add(
            "search_web",
            search::search_web_tool(
                providers.search_primary.clone(),
                providers.search_secondary.clone(),
            ),
        );
    }

    if let Some(image_provider) = providers.image_provider.clone() {
        registry.add(
            "generate_image",
            image::generate_image_tool(image_provider.clone()),
        );
        registry.add(
            "generate_altered_image",
            image::generate_altered_image_tool(image_provider),
        );
    }

    registry.add(
        "execute_wsl_command",
        wsl::execute_wsl_command_tool(providers.wsl_default_distribution.clone()),
    );
}

/// Shared helper: resolve a provider's API key the same way LLM credentials
/// are resolved — plaintext first, then the configured env var.
pub(crate) fn resolve_endpoint_key(endpoint: &lop_domain::config::ProviderEndpoint) -> Option<String> {
    if let Some(ref key) = endpoint.api_key {
        if !key.trim().is_empty() {
            return Some(key.clone());
        }
    }
    endpoint
        .api_key_env
        .as_ref()
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.trim().is_empty())
}
