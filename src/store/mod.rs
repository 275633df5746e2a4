//! Flat-file persistence for agents and swarms.
//!
//! Each collection is one JSON array on disk that is read, modified and
//! written back whole on every mutation. There is no locking: concurrent
//! writers race and the last one wins.

pub mod export;

use crate::config::StorageConfig;
use crate::models::{Agent, Swarm, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Which collection an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Agent,
    Swarm,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Agent => write!(f, "agent"),
            RecordKind::Swarm => write!(f, "swarm"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid {kind} index {index}: {len} stored")]
    IndexOutOfBounds {
        kind: RecordKind,
        index: usize,
        len: usize,
    },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Agent and swarm collections under one storage root.
#[derive(Debug, Clone)]
pub struct Store {
    agents_path: PathBuf,
    swarms_path: PathBuf,
    export_root: PathBuf,
}

impl Store {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            agents_path: storage.agents_path(),
            swarms_path: storage.swarms_path(),
            export_root: storage.export_path(),
        }
    }

    /// Append an agent; returns its index.
    pub fn save_agent(&self, agent: Agent) -> Result<usize, StoreError> {
        agent.validate()?;
        let mut agents: Vec<Agent> = read_array(&self.agents_path)?;
        agents.push(agent);
        write_array(&self.agents_path, &agents)?;
        info!("Saved agent #{}", agents.len() - 1);
        Ok(agents.len() - 1)
    }

    pub fn get_agents(&self) -> Result<Vec<Agent>, StoreError> {
        read_array(&self.agents_path)
    }

    pub fn get_agent(&self, index: usize) -> Result<Agent, StoreError> {
        let mut agents = self.get_agents()?;
        check_index(RecordKind::Agent, index, agents.len())?;
        Ok(agents.swap_remove(index))
    }

    pub fn update_agent(&self, index: usize, agent: Agent) -> Result<(), StoreError> {
        agent.validate()?;
        replace_at(&self.agents_path, RecordKind::Agent, index, agent)
    }

    /// Remove an agent; returns what was removed.
    pub fn delete_agent(&self, index: usize) -> Result<Agent, StoreError> {
        remove_at(&self.agents_path, RecordKind::Agent, index)
    }

    /// Append a swarm; returns its index.
    pub fn save_swarm(&self, swarm: Swarm) -> Result<usize, StoreError> {
        swarm.validate()?;
        let mut swarms: Vec<Swarm> = read_array(&self.swarms_path)?;
        swarms.push(swarm);
        write_array(&self.swarms_path, &swarms)?;
        info!("Saved swarm #{}", swarms.len() - 1);
        Ok(swarms.len() - 1)
    }

    pub fn get_swarms(&self) -> Result<Vec<Swarm>, StoreError> {
        read_array(&self.swarms_path)
    }

    pub fn get_swarm(&self, index: usize) -> Result<Swarm, StoreError> {
        let mut swarms = self.get_swarms()?;
        check_index(RecordKind::Swarm, index, swarms.len())?;
        Ok(swarms.swap_remove(index))
    }

    pub fn update_swarm(&self, index: usize, swarm: Swarm) -> Result<(), StoreError> {
        swarm.validate()?;
        replace_at(&self.swarms_path, RecordKind::Swarm, index, swarm)
    }

    pub fn delete_swarm(&self, index: usize) -> Result<Swarm, StoreError> {
        remove_at(&self.swarms_path, RecordKind::Swarm, index)
    }

    /// Directory that receives exported agent definitions.
    pub fn export_root(&self) -> &Path {
        &self.export_root
    }
}

fn check_index(kind: RecordKind, index: usize, len: usize) -> Result<(), StoreError> {
    if index >= len {
        return Err(StoreError::IndexOutOfBounds { kind, index, len });
    }
    Ok(())
}

fn replace_at<T>(path: &Path, kind: RecordKind, index: usize, record: T) -> Result<(), StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let mut records: Vec<T> = read_array(path)?;
    check_index(kind, index, records.len())?;
    records[index] = record;
    write_array(path, &records)?;
    info!("Updated {} #{}", kind, index);
    Ok(())
}

fn remove_at<T>(path: &Path, kind: RecordKind, index: usize) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let mut records: Vec<T> = read_array(path)?;
    check_index(kind, index, records.len())?;
    let removed = records.remove(index);
    write_array(path, &records)?;
    info!("Deleted {} #{}", kind, index);
    Ok(removed)
}

/// Read a whole JSON array; a missing file is an empty collection.
fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        debug!("{} does not exist yet", path.display());
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_array<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let content = serde_json::to_string_pretty(records).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content).map_err(io_err)?;

    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
