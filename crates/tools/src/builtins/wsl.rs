//! `execute_wsl_command` — run a command inside a WSL distribution and
//! capture its exit status and output, grounded on the subprocess-spawn
//! and timeout idiom used for foreground command execution.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;

use crate::registry::{Tool, ToolParam, ToolSignature};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

async fn run_wsl_command(
    command: &str,
    distribution: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<serde_json::Value, String> {
    let mut cmd = Command::new("wsl.exe");
    cmd.arg("-d").arg(distribution);
    if let Some(user) = user {
        cmd.arg("-u").arg(user);
    }
    cmd.arg("--").arg("sh").arg("-c").arg(command);

    if let Some(password) = password {
        cmd.env("LOP_WSL_PASSWORD", password);
    }

    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd
        .spawn()
        .map_err(|e| format!("failed to spawn wsl.exe: {e}"))?;

    let output = tokio::time::timeout(DEFAULT_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| format!("command timed out after {}s", DEFAULT_TIMEOUT.as_secs()))?
        .map_err(|e| format!("failed to wait on wsl.exe: {e}"))?;

    Ok(serde_json::json!({
        "success": output.status.success(),
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
        "return_code": output.status.code(),
    }))
}

pub fn execute_wsl_command_tool(default_distribution: Option<String>) -> Tool {
    Tool::new(
        ToolSignature {
            name: "execute_wsl_command".into(),
            params: vec![
                ToolParam::new("command", "string"),
                ToolParam::new("distribution", "string"),
                ToolParam::new("user", "string?"),
                ToolParam::new("password", "string?"),
            ],
            returns: "{ success, stdout, stderr, return_code }".into(),
            suspending: true,
            summary: "run a shell command inside a WSL distribution".into(),
        },
        Arc::new(move |args| {
            let default_distribution = default_distribution.clone();
            Box::pin(async move {
                let command = args
                    .get("command")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| "missing required param: command".to_string())?;
                let distribution = args
                    .get("distribution")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .or(default_distribution)
                    .ok_or_else(|| "no distribution specified and no default configured".to_string())?;
                let user = args.get("user").and_then(|v| v.as_str());
                let password = args.get("password").and_then(|v| v.as_str());

                run_wsl_command(command, &distribution, user, password).await
            })
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requires_command() {
        let tool = execute_wsl_command_tool(Some("Ubuntu".into()));
        let result = tool.call(serde_json::json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn requires_distribution_when_no_default() {
        let tool = execute_wsl_command_tool(None);
        let result = tool
            .call(serde_json::json!({"command": "echo hi"}))
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("no distribution"));
    }
}
