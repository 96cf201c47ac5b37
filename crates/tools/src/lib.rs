//! The Tool Registry: a mutable named catalog of tools exposed into the
//! code sandbox as `tools.<name>`, plus the built-in tool set.

mod builtins;
pub mod registry;

pub use registry::{Tool, ToolFn, ToolFuture, ToolOutput, ToolParam, ToolRegistry, ToolSignature};

use lop_domain::config::ToolProviderConfig;

/// Build a registry populated with every built-in whose provider
/// dependency is configured.
pub fn build_registry(providers: &ToolProviderConfig) -> ToolRegistry {
    let registry = ToolRegistry::new();
    builtins::register_all(&registry, providers);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_registry_always_includes_unconditional_builtins() {
        let registry = build_registry(&ToolProviderConfig::default());
        assert!(registry.get("get_page_html_content").is_some());
        assert!(registry.get("get_page_text_content").is_some());
        assert!(registry.get("list_working_directory").is_some());
        assert!(registry.get("execute_wsl_command").is_some());
    }

    #[test]
    fn build_registry_gates_optional_builtins_on_config() {
        let registry = build_registry(&ToolProviderConfig::default());
        assert!(registry.get("search_web").is_none());
        assert!(registry.get("generate_image").is_none());
        assert!(registry.get("generate_altered_image").is_none());

        let providers = ToolProviderConfig {
            search_primary: Some(lop_domain::config::ProviderEndpoint {
                base_url: "https://example.invalid/search".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let registry = build_registry(&providers);
        assert!(registry.get("search_web").is_some());
        assert!(registry.get("generate_image").is_none());
    }
}
