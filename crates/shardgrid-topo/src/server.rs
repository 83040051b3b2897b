//! TopoServer — typed access to the topology.
//!
//! Wraps a `Conn` and provides the record-level operations used by the
//! control plane. Record families are implemented in their own modules
//! (`keyspace`, `shard`, `tablet`, `replication`) as further `impl`
//! blocks on this type.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::codec;
use crate::conn::{Conn, Version};
use crate::error::{TopoError, TopoResult};
use crate::paths;
use crate::store::RedbConn;
use crate::types::CellInfo;

/// Attempts made by `update_node` before giving up on a contended node.
const MAX_UPDATE_ATTEMPTS: usize = 16;

/// Shared handle to the topology. Cheap to clone.
#[derive(Clone)]
pub struct TopoServer {
    conn: Arc<dyn Conn>,
}

impl TopoServer {
    /// Build a server over any storage backend.
    pub fn new(conn: Arc<dyn Conn>) -> Self {
        Self { conn }
    }

    /// Open a persistent topology and make sure `cells` are registered.
    pub fn open(path: &Path, cells: &[String]) -> TopoResult<Self> {
        let ts = Self::new(Arc::new(RedbConn::open(path)?));
        ts.ensure_cells(cells)?;
        Ok(ts)
    }

    /// Create an ephemeral topology with the given cells (for testing).
    pub fn open_in_memory(cells: &[&str]) -> TopoResult<Self> {
        let ts = Self::new(Arc::new(RedbConn::open_in_memory()?));
        for cell in cells {
            ts.create_cell_info(cell, &CellInfo::default())?;
        }
        Ok(ts)
    }

    /// Raw node access, for import/export.
    pub fn conn(&self) -> &dyn Conn {
        self.conn.as_ref()
    }

    // ── Cells ──────────────────────────────────────────────────────

    pub fn create_cell_info(&self, cell: &str, info: &CellInfo) -> TopoResult<()> {
        paths::validate_name("cell", cell).map_err(TopoError::InvalidArgument)?;
        self.create_record(&paths::cell_info_path(cell), info)?;
        info!(%cell, "cell registered");
        Ok(())
    }

    fn ensure_cells(&self, cells: &[String]) -> TopoResult<()> {
        for cell in cells {
            match self.create_cell_info(cell, &CellInfo::default()) {
                Ok(()) => {}
                Err(e) if e.is_node_exists() => debug!(%cell, "cell already registered"),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn get_cell_info(&self, cell: &str) -> TopoResult<CellInfo> {
        self.get_record(&paths::cell_info_path(cell))
            .map(|(info, _)| info)
    }

    /// Names of all registered cells, sorted.
    pub fn get_cell_info_names(&self) -> TopoResult<Vec<String>> {
        self.child_names(&paths::cells_glob())
    }

    // ── Typed helpers ──────────────────────────────────────────────

    pub(crate) fn get_record<T: DeserializeOwned>(&self, path: &str) -> TopoResult<(T, Version)> {
        let (data, version) = self.conn.get(path)?;
        Ok((codec::decode(path, &data)?, version))
    }

    pub(crate) fn create_record<T: Serialize>(&self, path: &str, value: &T) -> TopoResult<Version> {
        self.conn.create(path, &codec::encode(value)?)
    }

    pub(crate) fn put_record<T: Serialize>(
        &self,
        path: &str,
        value: &T,
        expected: Option<Version>,
    ) -> TopoResult<Version> {
        self.conn
            .compare_and_swap(path, expected, &codec::encode(value)?)
    }

    /// Read-modify-write a record with compare-and-swap.
    ///
    /// `update` returns `Ok(false)` to skip the write. On a version
    /// conflict the record is re-read and `update` applied again; after
    /// `MAX_UPDATE_ATTEMPTS` conflicts the last `BadVersion` is returned.
    pub(crate) fn update_node<T, F>(&self, path: &str, mut update: F) -> TopoResult<(T, Version)>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(&mut T) -> TopoResult<bool>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (mut value, version) = self.get_record::<T>(path)?;
            if !update(&mut value)? {
                return Ok((value, version));
            }
            match self.put_record(path, &value, Some(version)) {
                Ok(new_version) => return Ok((value, new_version)),
                Err(e) if e.is_bad_version() && attempt < MAX_UPDATE_ATTEMPTS => {
                    warn!(%path, attempt, "concurrent modification, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Parent directory names of every node matching `pattern`.
    pub(crate) fn child_names(&self, pattern: &str) -> TopoResult<Vec<String>> {
        let entries = self.conn.get_glob(pattern)?;
        Ok(entries
            .iter()
            .filter_map(|e| paths::parent_name(&e.path))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Keyspace;

    #[test]
    fn in_memory_registers_cells() {
        let ts = TopoServer::open_in_memory(&["cell2", "cell1"]).unwrap();
        assert_eq!(ts.get_cell_info_names().unwrap(), vec!["cell1", "cell2"]);
    }

    #[test]
    fn open_is_idempotent_for_cells() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("topo.redb");
        let cells = vec!["cell1".to_string()];

        drop(TopoServer::open(&db_path, &cells).unwrap());
        let ts = TopoServer::open(&db_path, &cells).unwrap();
        assert_eq!(ts.get_cell_info_names().unwrap(), vec!["cell1"]);
    }

    #[test]
    fn update_node_skips_write_when_unchanged() {
        let ts = TopoServer::open_in_memory(&["cell1"]).unwrap();
        let v1 = ts.create_record("/k/Keyspace", &Keyspace::default()).unwrap();

        let (_, v2) = ts
            .update_node::<Keyspace, _>("/k/Keyspace", |_| Ok(false))
            .unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn update_node_propagates_callback_error() {
        let ts = TopoServer::open_in_memory(&["cell1"]).unwrap();
        ts.create_record("/k/Keyspace", &Keyspace::default()).unwrap();

        let err = ts
            .update_node::<Keyspace, _>("/k/Keyspace", |_| {
                Err(TopoError::InvalidArgument("nope".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, TopoError::InvalidArgument(_)));
    }

    #[test]
    fn update_node_on_missing_is_no_node() {
        let ts = TopoServer::open_in_memory(&["cell1"]).unwrap();
        let err = ts
            .update_node::<Keyspace, _>("/k/Keyspace", |_| Ok(true))
            .unwrap_err();
        assert!(err.is_no_node());
    }
}
