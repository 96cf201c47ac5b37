//! On-disk Agent Registry.
//!
//! Persists one directory per agent under `config_dir/agents/<id>/`:
//! `meta.json` (name, timestamps), `state.json` (the `AgentState`), and
//! `sandbox.json` (an opaque snapshot of the code sandbox's namespace,
//! owned and interpreted by `lop-sandbox`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lop_domain::agent_state::AgentState;
use lop_domain::error::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bounds staleness when multiple processes share the on-disk store.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(3);

/// Registry-level metadata kept alongside each agent's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMeta {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_message_datetime: DateTime<Utc>,
}

/// Sort key for `AgentRegistry::list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Name,
    CreatedDate,
    LastMessageDatetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub name_contains: Option<String>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub page: usize,
    pub page_size: usize,
}

pub struct AgentRegistry {
    root: PathBuf,
    index: RwLock<HashMap<Uuid, AgentMeta>>,
    last_refresh: AtomicI64,
}

impl AgentRegistry {
    /// Load (or create) the registry rooted at `config_dir/agents`.
    pub fn new(config_dir: &Path) -> Result<Self> {
        let root = config_dir.join("agents");
        std::fs::create_dir_all(&root).map_err(Error::Io)?;

        let mut index = HashMap::new();
        if let Ok(entries) = std::fs::read_dir(&root) {
            for entry in entries.flatten() {
                let meta_path = entry.path().join("meta.json");
                if let Ok(raw) = std::fs::read_to_string(&meta_path) {
                    if let Ok(meta) = serde_json::from_str::<AgentMeta>(&raw) {
                        index.insert(meta.id, meta);
                    }
                }
            }
        }

        tracing::info!(agents = index.len(), path = %root.display(), "agent registry loaded");

        Ok(Self {
            root,
            index: RwLock::new(index),
            last_refresh: AtomicI64::new(now_millis()),
        })
    }

    fn agent_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// The per-agent workspace root READ/WRITE/EDIT actions are confined
    /// to. Created on first use alongside the agent's own directory.
    pub fn workspace_dir(&self, id: Uuid) -> Result<PathBuf> {
        let dir = self.agent_dir(id).join("workspace");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;
        Ok(dir)
    }

    /// Create a new agent with the given system prompt, returning its id.
    pub fn create(
        &self,
        name: Option<String>,
        agent_system_prompt: impl Into<String>,
        max_learnings: usize,
    ) -> Result<(Uuid, AgentState)> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let meta = AgentMeta {
            id,
            name,
            created_at: now,
            last_message_datetime: now,
        };
        let state = AgentState::new(agent_system_prompt, max_learnings);

        self.persist(&meta, &state, None)?;
        self.index.write().insert(id, meta);
        Ok((id, state))
    }

    /// Read an agent's current state and metadata from disk.
    pub fn get(&self, id: Uuid) -> Result<(AgentMeta, AgentState)> {
        let dir = self.agent_dir(id);
        let meta_raw = std::fs::read_to_string(dir.join("meta.json")).map_err(Error::Io)?;
        let state_raw = std::fs::read_to_string(dir.join("state.json")).map_err(Error::Io)?;
        let meta: AgentMeta = serde_json::from_str(&meta_raw).map_err(Error::Json)?;
        let state: AgentState = serde_json::from_str(&state_raw).map_err(Error::Json)?;
        Ok((meta, state))
    }

    /// Read the opaque sandbox namespace snapshot for an agent, if any.
    pub fn get_sandbox_snapshot(&self, id: Uuid) -> Result<Option<serde_json::Value>> {
        let path = self.agent_dir(id).join("sandbox.json");
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        Ok(Some(serde_json::from_str(&raw).map_err(Error::Json)?))
    }

    /// Persist updated state, bumping `last_message_datetime`.
    pub fn update(
        &self,
        id: Uuid,
        state: &AgentState,
        sandbox_snapshot: Option<&serde_json::Value>,
    ) -> Result<()> {
        let mut meta = {
            let index = self.index.read();
            index
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::Other(format!("unknown agent id {id}")))?
        };
        meta.last_message_datetime = Utc::now();
        self.persist(&meta, state, sandbox_snapshot)?;
        self.index.write().insert(id, meta);
        Ok(())
    }

    /// Rename an agent (or clear its name with `None`). Leaves state and
    /// sandbox untouched.
    pub fn rename(&self, id: Uuid, name: Option<String>) -> Result<()> {
        let mut meta = {
            let index = self.index.read();
            index
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::Other(format!("unknown agent id {id}")))?
        };
        meta.name = name;

        std::fs::write(
            self.agent_dir(id).join("meta.json"),
            serde_json::to_string_pretty(&meta).map_err(Error::Json)?,
        )
        .map_err(Error::Io)?;

        self.index.write().insert(id, meta);
        Ok(())
    }

    /// Delete an agent's directory and remove it from the index.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        let dir = self.agent_dir(id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(Error::Io)?;
        }
        self.index.write().remove(&id);
        Ok(())
    }

    /// Whether the in-memory index is older than [`REFRESH_WINDOW`] and
    /// should be reloaded from disk before serving a list request.
    pub fn is_stale(&self) -> bool {
        let elapsed = now_millis() - self.last_refresh.load(Ordering::Relaxed);
        elapsed as u64 > REFRESH_WINDOW.as_millis() as u64
    }

    /// Reload the in-memory index from disk, honoring the refresh window.
    pub fn refresh(&self) -> Result<()> {
        if !self.is_stale() {
            return Ok(());
        }
        let mut index = HashMap::new();
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let meta_path = entry.path().join("meta.json");
                if let Ok(raw) = std::fs::read_to_string(&meta_path) {
                    if let Ok(meta) = serde_json::from_str::<AgentMeta>(&raw) {
                        index.insert(meta.id, meta);
                    }
                }
            }
        }
        *self.index.write() = index;
        self.last_refresh.store(now_millis(), Ordering::Relaxed);
        Ok(())
    }

    /// List agents, optionally filtered by name substring, sorted, and
    /// paginated.
    pub fn list(&self, filter: &ListFilter) -> Vec<AgentMeta> {
        let _ = self.refresh();
        let mut entries: Vec<AgentMeta> = self.index.read().values().cloned().collect();

        if let Some(ref needle) = filter.name_contains {
            let needle = needle.to_lowercase();
            entries.retain(|m| {
                m.name
                    .as_deref()
                    .map(|n| n.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            });
        }

        match filter.sort_by.unwrap_or(SortBy::CreatedDate) {
            SortBy::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
            SortBy::CreatedDate => entries.sort_by_key(|m| m.created_at),
            SortBy::LastMessageDatetime => entries.sort_by_key(|m| m.last_message_datetime),
        }
        if filter.sort_order == Some(SortOrder::Desc) {
            entries.reverse();
        }

        if filter.page_size > 0 {
            let start = filter.page.saturating_mul(filter.page_size);
            entries.into_iter().skip(start).take(filter.page_size).collect()
        } else {
            entries
        }
    }

    pub(crate) fn persist(
        &self,
        meta: &AgentMeta,
        state: &AgentState,
        sandbox_snapshot: Option<&serde_json::Value>,
    ) -> Result<()> {
        let dir = self.agent_dir(meta.id);
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        std::fs::write(
            dir.join("meta.json"),
            serde_json::to_string_pretty(meta).map_err(Error::Json)?,
        )
        .map_err(Error::Io)?;

        std::fs::write(
            dir.join("state.json"),
            serde_json::to_string_pretty(state).map_err(Error::Json)?,
        )
        .map_err(Error::Io)?;

        if let Some(snapshot) = sandbox_snapshot {
            std::fs::write(
                dir.join("sandbox.json"),
                serde_json::to_string_pretty(snapshot).map_err(Error::Json)?,
            )
            .map_err(Error::Io)?;
        }

        Ok(())
    }

    /// Insert or replace an entry's in-memory index record without
    /// touching disk. Used by import, which persists directly.
    pub(crate) fn index_insert(&self, meta: AgentMeta) {
        self.index.write().insert(meta.id, meta);
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let registry = AgentRegistry::new(dir.path()).unwrap();
        let (id, _state) = registry
            .create(Some("scratch".into()), "you are an agent", 20)
            .unwrap();
        let (meta, state) = registry.get(id).unwrap();
        assert_eq!(meta.name.as_deref(), Some("scratch"));
        assert!(state.first_is_system_prompt());
    }

    #[test]
    fn list_filters_by_name_and_paginates() {
        let dir = tempdir().unwrap();
        let registry = AgentRegistry::new(dir.path()).unwrap();
        registry.create(Some("alpha".into()), "sys", 20).unwrap();
        registry.create(Some("beta".into()), "sys", 20).unwrap();
        registry.create(Some("alphabet".into()), "sys", 20).unwrap();

        let filter = ListFilter {
            name_contains: Some("alpha".into()),
            ..Default::default()
        };
        let results = registry.list(&filter);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn rename_updates_index_and_persists() {
        let dir = tempdir().unwrap();
        let registry = AgentRegistry::new(dir.path()).unwrap();
        let (id, _) = registry.create(Some("old-name".into()), "sys", 20).unwrap();

        registry.rename(id, Some("new-name".into())).unwrap();
        let (meta, _) = registry.get(id).unwrap();
        assert_eq!(meta.name.as_deref(), Some("new-name"));

        // Reload from disk to confirm the rename was persisted, not just
        // reflected in the in-memory index.
        let reloaded = AgentRegistry::new(dir.path()).unwrap();
        let (meta, _) = reloaded.get(id).unwrap();
        assert_eq!(meta.name.as_deref(), Some("new-name"));
    }

    #[test]
    fn delete_removes_from_index_and_disk() {
        let dir = tempdir().unwrap();
        let registry = AgentRegistry::new(dir.path()).unwrap();
        let (id, _) = registry.create(None, "sys", 20).unwrap();
        registry.delete(id).unwrap();
        assert!(registry.get(id).is_err());
    }
}
