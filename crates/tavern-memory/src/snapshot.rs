//! Snapshot persistence for memory state.
//!
//! A snapshot captures every agent's memories, all shared grants, and the
//! relationship matrix as one JSON document at
//! `<snapshot_dir>/<namespace>.json`. Mailboxes are ephemeral and are not
//! saved.
//!
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so a crash mid-write never leaves a truncated snapshot. File I/O
//! is retried with the configured [`RetryPolicy`]; the error surfaces once
//! retries are exhausted. In-memory state is never touched by a failed save
//! and is only replaced by a load after the file parsed successfully.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_types::{AgentId, MemoryRecord, RetryPolicy, SharedMemory};

use crate::error::MemoryError;
use crate::relationships::RelationshipMatrix;
use crate::store::{MemoryState, MemoryStore};

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized point-in-time copy of the memory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Format version.
    pub version: u32,
    /// When the copy was taken.
    pub saved_at: DateTime<Utc>,
    /// Every agent's records in insertion order.
    pub memories: BTreeMap<AgentId, Vec<MemoryRecord>>,
    /// Shared grants in creation order.
    pub shared: Vec<SharedMemory>,
    /// Directed relationship weights.
    pub relationships: BTreeMap<AgentId, BTreeMap<AgentId, Decimal>>,
}

impl MemoryStore {
    /// Copy the current state under a single read lock.
    pub fn snapshot(&self) -> MemorySnapshot {
        let state = self.read_state();
        MemorySnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            memories: state.memories.clone(),
            shared: state.shared.clone(),
            relationships: state.relationships.as_map().clone(),
        }
    }

    /// Replace memories, shared grants, and relationships with `snapshot`.
    ///
    /// Mailboxes are left as they are.
    pub fn restore(&self, snapshot: MemorySnapshot) {
        let restored = MemoryState {
            memories: snapshot.memories,
            shared: snapshot.shared,
            relationships: RelationshipMatrix::from_weights(snapshot.relationships),
        };
        let agents = restored.memories.len();
        *self.write_state() = restored;
        tracing::info!(agents, "Restored memory state from snapshot");
    }

    /// Persist the current state under `namespace`.
    ///
    /// The state is copied before any I/O starts, so no lock is held while
    /// writing.
    pub async fn save_snapshot(
        &self,
        store: &SnapshotStore,
        namespace: &str,
    ) -> Result<PathBuf, MemoryError> {
        let snapshot = self.snapshot();
        store.save(namespace, &snapshot).await
    }

    /// Load `namespace` and replace in-memory state with it.
    pub async fn load_snapshot(
        &self,
        store: &SnapshotStore,
        namespace: &str,
    ) -> Result<(), MemoryError> {
        let snapshot = store.load(namespace).await?;
        self.restore(snapshot);
        Ok(())
    }
}

/// File-backed snapshot storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    retry: RetryPolicy,
}

impl SnapshotStore {
    /// Create a store writing under `dir`.
    pub fn new(dir: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            dir: dir.into(),
            retry,
        }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path used for `namespace`.
    pub fn path_for(&self, namespace: &str) -> Result<PathBuf, MemoryError> {
        validate_namespace(namespace)?;
        Ok(self.dir.join(format!("{namespace}.json")))
    }

    /// Write `snapshot` under `namespace`, retrying I/O failures.
    pub async fn save(
        &self,
        namespace: &str,
        snapshot: &MemorySnapshot,
    ) -> Result<PathBuf, MemoryError> {
        let path = self.path_for(namespace)?;
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            match self.write_atomically(&path, &bytes).await {
                Ok(()) => {
                    tracing::info!(
                        namespace,
                        path = %path.display(),
                        bytes = bytes.len(),
                        "Saved memory snapshot"
                    );
                    return Ok(path);
                }
                Err(err) if attempt < attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        namespace,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Snapshot write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Read and decode the snapshot stored under `namespace`.
    ///
    /// A missing file fails immediately with
    /// [`MemoryError::SnapshotNotFound`]; other read errors are retried.
    pub async fn load(&self, namespace: &str) -> Result<MemorySnapshot, MemoryError> {
        let path = self.path_for(namespace)?;

        let attempts = self.retry.attempts();
        let mut attempt = 1;
        let bytes = loop {
            match tokio::fs::read(&path).await {
                Ok(bytes) => break bytes,
                Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                    return Err(MemoryError::SnapshotNotFound(path));
                }
                Err(source) if attempt < attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(namespace, attempt, error = %source, "Snapshot read failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => return Err(MemoryError::Io { path, source }),
            }
        };

        let snapshot: MemorySnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(MemoryError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        tracing::debug!(namespace, path = %path.display(), "Loaded memory snapshot");
        Ok(snapshot)
    }

    async fn write_atomically(&self, path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| MemoryError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| MemoryError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| MemoryError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Namespaces become file names, so only `[A-Za-z0-9_-]+` is allowed.
fn validate_namespace(namespace: &str) -> Result<(), MemoryError> {
    let valid = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(MemoryError::InvalidNamespace(namespace.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_rules() {
        assert!(validate_namespace("tavern_main-1").is_ok());
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("../etc").is_err());
        assert!(validate_namespace("a b").is_err());
    }

    #[test]
    fn path_lands_inside_dir() {
        let store = SnapshotStore::new("/var/tavern", RetryPolicy::no_retry());
        let path = store.path_for("main").ok();
        assert_eq!(path, Some(PathBuf::from("/var/tavern/main.json")));
    }
}
