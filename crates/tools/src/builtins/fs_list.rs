//! `list_working_directory` — walk the current working directory honoring
//! `.gitignore`, categorizing entries by extension.

use std::collections::BTreeMap;
use std::sync::Arc;

use ignore::WalkBuilder;
use serde::Serialize;

use crate::registry::{Tool, ToolParam, ToolSignature};

const HARD_IGNORE: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    "target",
    "dist",
    "build",
    ".venv",
    "venv",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
enum Category {
    Code,
    Doc,
    Data,
    Image,
    Config,
    Other,
}

fn categorize(name: &str) -> Category {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "rs" | "py" | "js" | "ts" | "tsx" | "jsx" | "go" | "java" | "c" | "cpp" | "h" | "hpp"
        | "rb" | "sh" | "rhai" => Category::Code,
        "md" | "txt" | "rst" | "adoc" => Category::Doc,
        "json" | "csv" | "tsv" | "parquet" | "db" | "sqlite" => Category::Data,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "bmp" => Category::Image,
        "toml" | "yaml" | "yml" | "ini" | "cfg" | "env" => Category::Config,
        _ => Category::Other,
    }
}

#[derive(Debug, Clone, Serialize)]
struct Entry {
    name: String,
    category: Category,
    size: u64,
}

pub fn list_working_directory_tool() -> Tool {
    Tool::new(
        ToolSignature {
            name: "list_working_directory".into(),
            params: vec![ToolParam::new("max_depth", "integer")],
            returns: "map<dir, [(name, category, size)]>".into(),
            suspending: false,
            summary: "list files under the working directory, honoring .gitignore".into(),
        },
        Arc::new(|args| {
            Box::pin(async move {
                let max_depth = args
                    .get("max_depth")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(3) as usize;
                list_working_directory(max_depth)
            })
        }),
    )
}

fn list_working_directory(max_depth: usize) -> Result<serde_json::Value, String> {
    let cwd = std::env::current_dir().map_err(|e| format!("cannot resolve cwd: {e}"))?;

    let mut by_dir: BTreeMap<String, Vec<Entry>> = BTreeMap::new();

    let walker = WalkBuilder::new(&cwd)
        .max_depth(Some(max_depth))
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !HARD_IGNORE.contains(&name))
                .unwrap_or(true)
        })
        .build();

    for result in walker {
        let entry = result.map_err(|e| format!("walk error: {e}"))?;
        if entry.path() == cwd {
            continue;
        }
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            continue;
        }
        let parent = entry
            .path()
            .parent()
            .unwrap_or(&cwd)
            .strip_prefix(&cwd)
            .unwrap_or_else(|_| std::path::Path::new("."))
            .to_string_lossy()
            .to_string();
        let dir_key = if parent.is_empty() { ".".to_string() } else { parent };
        let name = entry.file_name().to_string_lossy().to_string();
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        by_dir.entry(dir_key).or_default().push(Entry {
            category: categorize(&name),
            name,
            size,
        });
    }

    serde_json::to_value(&by_dir).map_err(|e| format!("failed to encode listing: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorize_recognizes_common_extensions() {
        assert_eq!(categorize("main.rs"), Category::Code);
        assert_eq!(categorize("README.md"), Category::Doc);
        assert_eq!(categorize("data.csv"), Category::Data);
        assert_eq!(categorize("logo.png"), Category::Image);
        assert_eq!(categorize("Cargo.toml"), Category::Config);
        assert_eq!(categorize("noext"), Category::Other);
    }

    #[test]
    fn list_working_directory_finds_this_crate() {
        let result = list_working_directory(3).unwrap();
        let obj = result.as_object().unwrap();
        assert!(!obj.is_empty());
    }
}
