/// Format one labeled section of the heads-up display with
/// machine-inspectable delimiters, in the same style the teacher uses for
/// workspace file injection.
pub fn format_section(label: &str, content: &str) -> String {
    format!(
        "\
=== {label} ===
{content}
=== END_{label} ===
"
    )
}

/// Format the environment details section (cwd, date, agent id).
pub fn format_env_details(cwd: &str, timestamp: &str, agent_id: &str) -> String {
    format_section(
        "ENVIRONMENT_DETAILS",
        &format!("cwd: {cwd}\ndate: {timestamp}\nagent_id: {agent_id}"),
    )
}

/// Format the learnings section.
pub fn format_learnings<'a>(learnings: impl Iterator<Item = &'a String>) -> String {
    let body: Vec<&str> = learnings.map(|s| s.as_str()).collect();
    if body.is_empty() {
        return String::new();
    }
    format_section("LEARNINGS", &body.join("\n- "))
}

/// Format the current plan section, empty string if there is no plan.
pub fn format_plan(plan: Option<&str>) -> String {
    match plan {
        Some(p) if !p.is_empty() => format_section("CURRENT_PLAN", p),
        _ => String::new(),
    }
}

/// Format the instruction-details section, empty string if unset.
pub fn format_instruction_details(details: Option<&str>) -> String {
    match details {
        Some(d) if !d.is_empty() => format_section("INSTRUCTION_DETAILS", d),
        _ => String::new(),
    }
}

/// Format the sandbox's persistent namespace section, empty string if there
/// are no bindings to show.
pub fn format_namespace_vars(namespace: Option<&str>) -> String {
    match namespace {
        Some(n) if !n.is_empty() => format_section("SANDBOX_NAMESPACE", n),
        _ => String::new(),
    }
}

/// Best-effort `git status --porcelain` summary for `cwd`, swallowing
/// errors when `cwd` isn't inside a git repository or `git` isn't on PATH.
pub fn format_git_status(cwd: &str) -> String {
    let output = std::process::Command::new("git")
        .args(["status", "--porcelain"])
        .current_dir(cwd)
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            if text.trim().is_empty() {
                String::new()
            } else {
                format_section("GIT_STATUS", text.trim_end())
            }
        }
        _ => String::new(),
    }
}
