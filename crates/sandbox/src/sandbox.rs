//! The embedded code-execution sandbox. Each agent session owns one
//! [`CodeSandbox`]: a `rhai` engine plus a persistent scope, with the Tool
//! Registry bound into it as a `tools` variable so generated code can call
//! `tools.search_web(#{query: "..."})`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lop_domain::error::Error;
use lop_tools::ToolRegistry;
use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};

use crate::annotate::{annotate_code, AGENT_GENERATED_CODE_SENTINEL};
use crate::namespace::{json_to_scope, scope_to_json};

/// The `tools` binding seen by generated code. Every tool call is dispatched
/// through a per-tool native function registered at construction time, so
/// this marker type carries no state of its own.
///
/// Generated code always calls a tool with exactly one object-map argument,
/// even for tools that take no parameters (`tools.list_working_directory(#{})`)
/// — this keeps the registered signature uniform across every built-in.
#[derive(Debug, Clone)]
struct Tools;

/// The result of a successful [`CodeSandbox::run`]. An execution that raises
/// is surfaced as an [`Error::CodeExecution`] instead, carrying the
/// annotated snippet.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Everything written via `print(...)`.
    pub stdout: String,
    /// Everything written via `debug(...)`.
    pub log_output: String,
    /// Reserved for a future separate error stream; `rhai` has none on the
    /// success path, so this is always empty.
    pub stderr: String,
    /// The value the snippet evaluated to, if representable as JSON.
    pub result: Option<serde_json::Value>,
}

struct Inner {
    engine: Engine,
    scope: Mutex<Scope<'static>>,
    stdout_sink: Arc<Mutex<String>>,
    log_sink: Arc<Mutex<String>>,
    dirty: AtomicBool,
}

impl Inner {
    fn run_sync(&self, code: &str) -> Result<ExecutionOutcome, Error> {
        self.stdout_sink.lock().clear();
        self.log_sink.lock().clear();

        let mut ast = self.engine.compile(code).map_err(|err| {
            let annotated = annotate_code(code, err.1.line());
            Error::CodeExecution {
                message: err.0.to_string(),
                annotated_code: annotated,
                agent_info_str: None,
            }
        })?;
        ast.set_source(AGENT_GENERATED_CODE_SENTINEL);

        let mut scope = self.scope.lock();
        let eval_result = self.engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast);
        self.dirty.store(true, Ordering::Relaxed);

        match eval_result {
            Ok(value) => Ok(ExecutionOutcome {
                stdout: self.stdout_sink.lock().clone(),
                log_output: self.log_sink.lock().clone(),
                stderr: String::new(),
                result: dynamic_to_json(&value),
            }),
            Err(err) => {
                let annotated = annotate_code(code, err.position().line());
                Err(Error::CodeExecution {
                    message: err.to_string(),
                    annotated_code: annotated,
                    agent_info_str: None,
                })
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.dirty.load(Ordering::Relaxed) {
            tracing::warn!("sandbox namespace changed but was never snapshotted before drop");
        }
    }
}

fn dynamic_to_json(value: &Dynamic) -> Option<serde_json::Value> {
    if value.is_unit() {
        return None;
    }
    rhai::serde::from_dynamic::<serde_json::Value>(value).ok()
}

fn bridge_tool_call(
    tool: Arc<lop_tools::Tool>,
    args: Dynamic,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let json_args =
        rhai::serde::from_dynamic::<serde_json::Value>(&args).unwrap_or(serde_json::Value::Null);

    let outcome = tokio::task::block_in_place(|| {
        tokio::runtime::Handle::current().block_on(tool.call(json_args))
    });

    match outcome {
        Ok(value) => rhai::serde::to_dynamic(value).map_err(|err| err.to_string().into()),
        Err(message) => Err(message.into()),
    }
}

pub struct CodeSandbox {
    inner: Arc<Inner>,
}

impl CodeSandbox {
    /// Build a sandbox with one native function registered per tool
    /// currently in `registry`. The registry's membership is snapshotted at
    /// construction time — tools added afterwards are not visible to
    /// already-built sandboxes.
    pub fn new(registry: &ToolRegistry) -> Self {
        let mut engine = Engine::new();

        let stdout_sink = Arc::new(Mutex::new(String::new()));
        let log_sink = Arc::new(Mutex::new(String::new()));

        let print_sink = stdout_sink.clone();
        engine.on_print(move |s| {
            let mut buf = print_sink.lock();
            buf.push_str(s);
            buf.push('\n');
        });

        let debug_sink = log_sink.clone();
        engine.on_debug(move |s, src, pos| {
            let mut buf = debug_sink.lock();
            match src {
                Some(src) => buf.push_str(&format!("[{src}:{pos:?}] {s}\n")),
                None => buf.push_str(&format!("[{pos:?}] {s}\n")),
            }
        });

        engine.register_type_with_name::<Tools>("Tools");
        for tool in registry.iterate() {
            let name = tool.signature.name.clone();
            let tool = tool.clone();
            engine.register_fn(name.as_str(), move |_this: &mut Tools, args: Dynamic| {
                bridge_tool_call(tool.clone(), args)
            });
        }

        let mut scope = Scope::new();
        scope.push("tools", Tools);

        Self {
            inner: Arc::new(Inner {
                engine,
                scope: Mutex::new(scope),
                stdout_sink,
                log_sink,
                dirty: AtomicBool::new(false),
            }),
        }
    }

    /// Evaluate `code` against the persistent scope. Runs on a blocking
    /// thread since tool calls made from inside the script bridge back into
    /// async code via `block_on`.
    pub async fn run(&self, code: &str) -> Result<ExecutionOutcome, Error> {
        let inner = self.inner.clone();
        let code = code.to_string();
        tokio::task::spawn_blocking(move || inner.run_sync(&code))
            .await
            .map_err(|err| Error::Other(format!("sandbox execution task panicked: {err}")))?
    }

    /// Serialize the current namespace to JSON for persistence. Clears the
    /// dirty flag.
    pub fn snapshot(&self) -> serde_json::Value {
        let json = scope_to_json(&self.inner.scope.lock());
        self.inner.dirty.store(false, Ordering::Relaxed);
        json
    }

    /// Replace the current namespace with one restored from JSON. The
    /// `tools` binding is re-added since it is never part of a snapshot.
    pub fn restore(&self, namespace: &serde_json::Value) {
        let mut restored = json_to_scope(namespace);
        restored.push("tools", Tools);
        *self.inner.scope.lock() = restored;
        self.inner.dirty.store(false, Ordering::Relaxed);
    }

    /// Render the persistent namespace as `name = value` lines, one per
    /// bound variable (the internal `tools` binding is skipped), so the HUD
    /// can show the model what already exists without it re-reading code.
    pub fn describe_namespace(&self) -> String {
        let scope = self.inner.scope.lock();
        scope
            .iter()
            .filter(|(name, _, _)| *name != "tools")
            .map(|(name, _, value)| format!("{name} = {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lop_tools::{Tool, ToolParam, ToolSignature};

    fn registry_with_double_tool() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.add(
            "double",
            Tool::new(
                ToolSignature {
                    name: "double".into(),
                    params: vec![ToolParam::new("n", "number")],
                    returns: "number".into(),
                    suspending: false,
                    summary: "double a number".into(),
                },
                Arc::new(|args| {
                    Box::pin(async move {
                        let n = args["n"].as_i64().ok_or_else(|| "missing n".to_string())?;
                        Ok(serde_json::json!(n * 2))
                    })
                }),
            ),
        );
        registry
    }

    #[tokio::test]
    async fn evaluates_expressions_and_returns_json_result() {
        let sandbox = CodeSandbox::new(&ToolRegistry::new());
        let outcome = sandbox.run("40 + 2").await.unwrap();
        assert_eq!(outcome.result, Some(serde_json::json!(42)));
    }

    #[tokio::test]
    async fn captures_print_and_debug_output() {
        let sandbox = CodeSandbox::new(&ToolRegistry::new());
        let outcome = sandbox.run("print(\"hello\"); debug(\"trace\");").await.unwrap();
        assert!(outcome.stdout.contains("hello"));
        assert!(outcome.log_output.contains("trace"));
    }

    #[tokio::test]
    async fn namespace_persists_across_runs() {
        let sandbox = CodeSandbox::new(&ToolRegistry::new());
        sandbox.run("let x = 5;").await.unwrap();
        let outcome = sandbox.run("x + 1").await.unwrap();
        assert_eq!(outcome.result, Some(serde_json::json!(6)));
    }

    #[tokio::test]
    async fn bridges_tool_calls_through_tools_binding() {
        let sandbox = CodeSandbox::new(&registry_with_double_tool());
        let outcome = sandbox.run("tools.double(#{n: 21})").await.unwrap();
        assert_eq!(outcome.result, Some(serde_json::json!(42)));
    }

    #[tokio::test]
    async fn errors_carry_annotated_code_with_failing_line() {
        let sandbox = CodeSandbox::new(&ToolRegistry::new());
        let err = sandbox
            .run("let x = 1;\nlet y = missing_fn();")
            .await
            .unwrap_err();
        match err {
            Error::CodeExecution { annotated_code, .. } => {
                assert!(annotated_code.contains(">>"));
                assert!(annotated_code.contains("missing_fn"));
            }
            other => panic!("expected CodeExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn describe_namespace_lists_bound_variables_and_skips_tools() {
        let sandbox = CodeSandbox::new(&ToolRegistry::new());
        sandbox.run("let count = 10;\nlet label = \"x\";").await.unwrap();
        let described = sandbox.describe_namespace();
        assert!(described.contains("count = 10"));
        assert!(described.contains("label = "));
        assert!(!described.contains("tools"));
    }

    #[tokio::test]
    async fn snapshot_and_restore_round_trip_the_namespace() {
        let sandbox = CodeSandbox::new(&ToolRegistry::new());
        sandbox.run("let count = 10;").await.unwrap();
        let snapshot = sandbox.snapshot();

        let restored_sandbox = CodeSandbox::new(&ToolRegistry::new());
        restored_sandbox.restore(&snapshot);
        let outcome = restored_sandbox.run("count + 1").await.unwrap();
        assert_eq!(outcome.result, Some(serde_json::json!(11)));
    }
}
