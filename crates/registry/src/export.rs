//! Agent import/export as a zip archive containing an `agent.yml` manifest
//! plus the agent's `state.json` and (if present) `sandbox.json`.

use std::io::{Read, Write};

use lop_domain::agent_state::AgentState;
use lop_domain::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zip::write::SimpleFileOptions;

use crate::store::{AgentMeta, AgentRegistry};

/// The manifest stored at the root of an export archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentManifest {
    pub exported_id: Uuid,
    pub name: Option<String>,
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub format_version: u32,
}

impl AgentManifest {
    pub const FORMAT_VERSION: u32 = 1;
}

/// Export an agent to an in-memory zip archive.
pub fn export_agent(registry: &AgentRegistry, id: Uuid) -> Result<Vec<u8>> {
    let (meta, state) = registry.get(id)?;
    let sandbox = registry.get_sandbox_snapshot(id)?;

    let manifest = AgentManifest {
        exported_id: meta.id,
        name: meta.name.clone(),
        exported_at: chrono::Utc::now(),
        format_version: AgentManifest::FORMAT_VERSION,
    };

    let mut buf = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        writer
            .start_file("agent.yml", options)
            .map_err(|e| Error::Other(format!("zip write: {e}")))?;
        writer
            .write_all(
                serde_yaml::to_string(&manifest)
                    .map_err(|e| Error::Other(format!("yaml encode: {e}")))?
                    .as_bytes(),
            )
            .map_err(Error::Io)?;

        writer
            .start_file("state.json", options)
            .map_err(|e| Error::Other(format!("zip write: {e}")))?;
        writer
            .write_all(
                serde_json::to_string_pretty(&state)
                    .map_err(Error::Json)?
                    .as_bytes(),
            )
            .map_err(Error::Io)?;

        if let Some(snapshot) = sandbox {
            writer
                .start_file("sandbox.json", options)
                .map_err(|e| Error::Other(format!("zip write: {e}")))?;
            writer
                .write_all(
                    serde_json::to_string_pretty(&snapshot)
                        .map_err(Error::Json)?
                        .as_bytes(),
                )
                .map_err(Error::Io)?;
        }

        writer
            .finish()
            .map_err(|e| Error::Other(format!("zip finish: {e}")))?;
    }

    Ok(buf)
}

/// Import an agent from a zip archive produced by [`export_agent`]. A fresh
/// id is always minted; the original `exported_id` is discarded along with
/// any working-directory state the archive carried, per the registry's
/// import contract.
pub fn import_agent(registry: &AgentRegistry, archive_bytes: &[u8]) -> Result<Uuid> {
    let cursor = std::io::Cursor::new(archive_bytes);
    let mut zip = zip::ZipArchive::new(cursor)
        .map_err(|e| Error::Other(format!("invalid archive: {e}")))?;

    let manifest: AgentManifest = {
        let mut file = zip
            .by_name("agent.yml")
            .map_err(|_| Error::Other("archive missing agent.yml".into()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(Error::Io)?;
        serde_yaml::from_str(&contents).map_err(|e| Error::Other(format!("yaml decode: {e}")))?
    };

    let state: AgentState = {
        let mut file = zip
            .by_name("state.json")
            .map_err(|_| Error::Other("archive missing state.json".into()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(Error::Io)?;
        serde_json::from_str(&contents).map_err(Error::Json)?
    };

    let sandbox_snapshot: Option<serde_json::Value> = match zip.by_name("sandbox.json") {
        Ok(mut file) => {
            let mut contents = String::new();
            file.read_to_string(&mut contents).map_err(Error::Io)?;
            Some(serde_json::from_str(&contents).map_err(Error::Json)?)
        }
        Err(_) => None,
    };

    let new_id = Uuid::new_v4();
    let now = chrono::Utc::now();
    let meta = AgentMeta {
        id: new_id,
        name: manifest.name,
        created_at: now,
        last_message_datetime: now,
    };

    registry.persist(&meta, &state, sandbox_snapshot.as_ref())?;
    registry.index_insert(meta);

    Ok(new_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn export_then_import_mints_a_fresh_id() {
        let dir = tempdir().unwrap();
        let registry = AgentRegistry::new(dir.path()).unwrap();
        let (id, _state) = registry
            .create(Some("scratch".into()), "you are an agent", 20)
            .unwrap();

        let archive = export_agent(&registry, id).unwrap();
        let new_id = import_agent(&registry, &archive).unwrap();

        assert_ne!(id, new_id);
        let (meta, _) = registry.get(new_id).unwrap();
        assert_eq!(meta.name.as_deref(), Some("scratch"));
    }
}
