//! A mutable named catalog of tools exposed into the code sandbox as
//! `tools.<name>`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The outcome of a tool call. Errors are returned as strings rather than
/// the domain `Error` type — they are surfaced to the model as part of its
/// own conversation turn, not propagated as a runtime fault.
pub type ToolOutput = std::result::Result<serde_json::Value, String>;

pub type ToolFuture = Pin<Box<dyn Future<Output = ToolOutput> + Send>>;

/// A tool is always invoked asynchronously; whether it actually suspends
/// is recorded in its [`ToolSignature`] for documentation purposes and has
/// no bearing on how the registry calls it — the sandbox awaits every call.
pub type ToolFn = Arc<dyn Fn(serde_json::Value) -> ToolFuture + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ToolParam {
    pub name: String,
    pub ty: String,
}

impl ToolParam {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A human-readable tool signature used to render the system-prompt tool
/// list: name, parameter names with semantic types, return type, whether
/// the tool suspends, and the first line of its doc.
#[derive(Debug, Clone)]
pub struct ToolSignature {
    pub name: String,
    pub params: Vec<ToolParam>,
    pub returns: String,
    pub suspending: bool,
    pub summary: String,
}

impl ToolSignature {
    pub fn render(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let suspend = if self.suspending { " (suspending)" } else { "" };
        format!(
            "{}({}) -> {}{} — {}",
            self.name, params, self.returns, suspend, self.summary
        )
    }
}

pub struct Tool {
    pub signature: ToolSignature,
    pub func: ToolFn,
}

impl Tool {
    pub fn new(signature: ToolSignature, func: ToolFn) -> Self {
        Self { signature, func }
    }

    pub async fn call(&self, args: serde_json::Value) -> ToolOutput {
        (self.func)(args).await
    }
}

/// Mutable named catalog of tools. Cheap to share: clone the `Arc<Tool>`
/// handed back by [`ToolRegistry::get`] rather than holding the registry
/// lock across an `await`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: parking_lot::RwLock<HashMap<String, Arc<Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: impl Into<String>, tool: Tool) {
        self.tools.write().insert(name.into(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.write().remove(name)
    }

    /// All registered tools, sorted by name for deterministic output.
    pub fn iterate(&self) -> Vec<Arc<Tool>> {
        let tools = self.tools.read();
        let mut entries: Vec<Arc<Tool>> = tools.values().cloned().collect();
        entries.sort_by(|a, b| a.signature.name.cmp(&b.signature.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    /// Render the full tool list for inclusion in a system prompt.
    pub fn system_prompt_tool_list(&self) -> String {
        self.iterate()
            .iter()
            .map(|t| t.signature.render())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_tool(name: &str) -> Tool {
        Tool::new(
            ToolSignature {
                name: name.to_string(),
                params: vec![ToolParam::new("text", "string")],
                returns: "string".into(),
                suspending: false,
                summary: "echo the input back".into(),
            },
            Arc::new(|args| Box::pin(async move { Ok(args) })),
        )
    }

    #[test]
    fn add_get_remove_round_trip() {
        let registry = ToolRegistry::new();
        registry.add("echo", echo_tool("echo"));
        assert!(registry.get("echo").is_some());
        assert_eq!(registry.len(), 1);
        let removed = registry.remove("echo");
        assert!(removed.is_some());
        assert!(registry.get("echo").is_none());
    }

    #[test]
    fn iterate_is_sorted_by_name() {
        let registry = ToolRegistry::new();
        registry.add("zeta", echo_tool("zeta"));
        registry.add("alpha", echo_tool("alpha"));
        let names: Vec<String> = registry
            .iterate()
            .iter()
            .map(|t| t.signature.name.clone())
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[tokio::test]
    async fn call_invokes_the_underlying_fn() {
        let registry = ToolRegistry::new();
        registry.add("echo", echo_tool("echo"));
        let tool = registry.get("echo").unwrap();
        let result = tool.call(serde_json::json!({"text": "hi"})).await.unwrap();
        assert_eq!(result["text"], "hi");
    }

    #[test]
    fn render_includes_suspending_marker() {
        let sig = ToolSignature {
            name: "fetch".into(),
            params: vec![ToolParam::new("url", "string")],
            returns: "string".into(),
            suspending: true,
            summary: "fetch a page".into(),
        };
        assert!(sig.render().contains("(suspending)"));
    }
}
