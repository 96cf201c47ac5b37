use lop_domain::conversation::ConversationRecord;

use crate::injection;
use crate::truncation::{self, Block};

/// Deterministic builder for the ephemeral "heads-up display" record
/// re-materialized before every model dispatch (spec's Ephemerality rule):
/// environment details, learnings, current plan, instruction details,
/// the sandbox's persistent namespace, and a best-effort git status.
pub struct HudBuilder {
    pub total_max_chars: usize,
}

impl HudBuilder {
    pub fn new(total_max_chars: usize) -> Self {
        Self { total_max_chars }
    }

    pub fn build<'a>(
        &self,
        cwd: &str,
        timestamp: &str,
        agent_id: &str,
        learnings: impl Iterator<Item = &'a String>,
        current_plan: Option<&str>,
        instruction_details: Option<&str>,
        namespace_vars: Option<&str>,
    ) -> ConversationRecord {
        let env = injection::format_env_details(cwd, timestamp, agent_id);
        let learnings_section = injection::format_learnings(learnings);
        let plan_section = injection::format_plan(current_plan);
        let instructions_section = injection::format_instruction_details(instruction_details);
        let namespace_section = injection::format_namespace_vars(namespace_vars);
        let git_status_section = injection::format_git_status(cwd);

        let mut blocks: Vec<Block> = [
            env,
            learnings_section,
            plan_section,
            instructions_section,
            namespace_section,
            git_status_section,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|content| Block {
            label: String::new(),
            raw_chars: content.len(),
            content,
            truncated_per_block: false,
            truncated_total_cap: false,
            included: true,
        })
        .collect();

        truncation::apply_total_cap(&mut blocks, self.total_max_chars);

        let assembled = blocks
            .into_iter()
            .filter(|b| b.included)
            .map(|b| b.content)
            .collect::<Vec<_>>()
            .join("\n");

        ConversationRecord::ephemeral_hud(assembled)
    }
}
