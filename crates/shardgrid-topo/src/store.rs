//! RedbConn — redb-backed topology storage.
//!
//! Node payloads and versions are kept in two tables keyed by the node
//! path. Every mutation runs in its own write transaction and stamps the
//! node with the next value of a store-wide revision counter. The store
//! supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use tracing::debug;

use crate::conn::{Conn, NodeEntry, Version};
use crate::error::{TopoError, TopoResult};
use crate::glob::GlobPattern;
use crate::tables::*;

/// Convert any `Display` storage error into `TopoError::Unavailable`.
macro_rules! unavailable {
    ($what:literal) => {
        |e| TopoError::Unavailable(format!(concat!($what, ": {}"), e))
    };
}

/// Thread-safe topology store backed by redb.
#[derive(Clone)]
pub struct RedbConn {
    db: Arc<Database>,
}

impl RedbConn {
    /// Open (or create) a persistent topology store at the given path.
    pub fn open(path: &Path) -> TopoResult<Self> {
        let db = Database::create(path).map_err(unavailable!("open database"))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "topology store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory topology store (for testing).
    pub fn open_in_memory() -> TopoResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(unavailable!("open database"))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory topology store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> TopoResult<()> {
        let txn = self.db.begin_write().map_err(unavailable!("begin write"))?;
        txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
        txn.open_table(VERSIONS).map_err(unavailable!("open versions"))?;
        txn.open_table(META).map_err(unavailable!("open meta"))?;
        txn.commit().map_err(unavailable!("commit"))?;
        Ok(())
    }
}

/// Bump and return the store-wide revision inside `txn`.
fn next_revision(txn: &WriteTransaction) -> TopoResult<Version> {
    let mut meta = txn.open_table(META).map_err(unavailable!("open meta"))?;
    let current = meta
        .get(REVISION_KEY)
        .map_err(unavailable!("read revision"))?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let next = current + 1;
    meta.insert(REVISION_KEY, next)
        .map_err(unavailable!("write revision"))?;
    Ok(next)
}

fn check_path(path: &str) -> TopoResult<()> {
    let valid = path
        .strip_prefix('/')
        .is_some_and(|rest| !rest.is_empty() && !rest.split('/').any(str::is_empty));
    if valid {
        Ok(())
    } else {
        Err(TopoError::InvalidArgument(format!(
            "invalid node path {path:?}"
        )))
    }
}

impl Conn for RedbConn {
    fn get(&self, path: &str) -> TopoResult<(Vec<u8>, Version)> {
        let txn = self.db.begin_read().map_err(unavailable!("begin read"))?;
        let nodes = txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
        let versions = txn
            .open_table(VERSIONS)
            .map_err(unavailable!("open versions"))?;

        let data = match nodes.get(path).map_err(unavailable!("read node"))? {
            Some(guard) => guard.value().to_vec(),
            None => return Err(TopoError::NoNode(path.to_string())),
        };
        let version = versions
            .get(path)
            .map_err(unavailable!("read version"))?
            .map(|guard| guard.value())
            .unwrap_or_default();
        Ok((data, version))
    }

    fn get_glob(&self, pattern: &str) -> TopoResult<Vec<NodeEntry>> {
        let glob = GlobPattern::compile(pattern)?;
        let prefix = glob.literal_prefix();

        let txn = self.db.begin_read().map_err(unavailable!("begin read"))?;
        let nodes = txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
        let versions = txn
            .open_table(VERSIONS)
            .map_err(unavailable!("open versions"))?;

        let mut results = Vec::new();
        for entry in nodes.range(prefix..).map_err(unavailable!("scan nodes"))? {
            let (key, value) = entry.map_err(unavailable!("scan nodes"))?;
            let path = key.value();
            if !path.starts_with(prefix) {
                break;
            }
            if !glob.matches(path) {
                continue;
            }
            let version = versions
                .get(path)
                .map_err(unavailable!("read version"))?
                .map(|guard| guard.value())
                .unwrap_or_default();
            results.push(NodeEntry {
                path: path.to_string(),
                data: value.value().to_vec(),
                version,
            });
        }
        Ok(results)
    }

    fn create(&self, path: &str, data: &[u8]) -> TopoResult<Version> {
        check_path(path)?;
        let txn = self.db.begin_write().map_err(unavailable!("begin write"))?;
        let version = next_revision(&txn)?;
        {
            let mut nodes = txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
            if nodes.get(path).map_err(unavailable!("read node"))?.is_some() {
                return Err(TopoError::NodeExists(path.to_string()));
            }
            nodes
                .insert(path, data)
                .map_err(unavailable!("write node"))?;
            let mut versions = txn
                .open_table(VERSIONS)
                .map_err(unavailable!("open versions"))?;
            versions
                .insert(path, version)
                .map_err(unavailable!("write version"))?;
        }
        txn.commit().map_err(unavailable!("commit"))?;
        debug!(%path, version, "node created");
        Ok(version)
    }

    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Version>,
        data: &[u8],
    ) -> TopoResult<Version> {
        check_path(path)?;
        let txn = self.db.begin_write().map_err(unavailable!("begin write"))?;
        let version = next_revision(&txn)?;
        {
            let mut versions = txn
                .open_table(VERSIONS)
                .map_err(unavailable!("open versions"))?;
            let current = versions
                .get(path)
                .map_err(unavailable!("read version"))?
                .map(|guard| guard.value());
            match (expected, current) {
                (Some(_), None) => return Err(TopoError::NoNode(path.to_string())),
                (Some(expected), Some(actual)) if expected != actual => {
                    return Err(TopoError::BadVersion {
                        path: path.to_string(),
                        expected,
                        actual,
                    });
                }
                _ => {}
            }
            versions
                .insert(path, version)
                .map_err(unavailable!("write version"))?;
            let mut nodes = txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
            nodes
                .insert(path, data)
                .map_err(unavailable!("write node"))?;
        }
        txn.commit().map_err(unavailable!("commit"))?;
        debug!(%path, ?expected, version, "node updated");
        Ok(version)
    }

    fn delete(&self, path: &str) -> TopoResult<()> {
        let txn = self.db.begin_write().map_err(unavailable!("begin write"))?;
        {
            let mut nodes = txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
            if nodes
                .remove(path)
                .map_err(unavailable!("delete node"))?
                .is_none()
            {
                return Err(TopoError::NoNode(path.to_string()));
            }
            let mut versions = txn
                .open_table(VERSIONS)
                .map_err(unavailable!("open versions"))?;
            versions
                .remove(path)
                .map_err(unavailable!("delete version"))?;
        }
        txn.commit().map_err(unavailable!("commit"))?;
        debug!(%path, "node deleted");
        Ok(())
    }

    fn delete_recursive(&self, prefix: &str) -> TopoResult<u32> {
        let root = prefix.trim_end_matches('/');
        let child_prefix = format!("{root}/");

        // Collect keys in a read transaction first.
        let keys: Vec<String> = {
            let txn = self.db.begin_read().map_err(unavailable!("begin read"))?;
            let nodes = txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
            let mut keys = Vec::new();
            for entry in nodes.range(root..).map_err(unavailable!("scan nodes"))? {
                let (key, _) = entry.map_err(unavailable!("scan nodes"))?;
                let k = key.value();
                if !k.starts_with(root) {
                    break;
                }
                if k == root || k.starts_with(&child_prefix) {
                    keys.push(k.to_string());
                }
            }
            keys
        };

        // Delete in a write transaction.
        let txn = self.db.begin_write().map_err(unavailable!("begin write"))?;
        let mut count = 0;
        {
            let mut nodes = txn.open_table(NODES).map_err(unavailable!("open nodes"))?;
            let mut versions = txn
                .open_table(VERSIONS)
                .map_err(unavailable!("open versions"))?;
            for key in &keys {
                if nodes
                    .remove(key.as_str())
                    .map_err(unavailable!("delete node"))?
                    .is_some()
                {
                    count += 1;
                }
                versions
                    .remove(key.as_str())
                    .map_err(unavailable!("delete version"))?;
            }
        }
        txn.commit().map_err(unavailable!("commit"))?;
        debug!(prefix = %root, count, "subtree deleted");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> RedbConn {
        RedbConn::open_in_memory().unwrap()
    }

    // ── Single-node CRUD ───────────────────────────────────────────

    #[test]
    fn create_and_get() {
        let conn = test_conn();
        let version = conn.create("/keyspaces/ks1/Keyspace", b"{}").unwrap();

        let (data, got) = conn.get("/keyspaces/ks1/Keyspace").unwrap();
        assert_eq!(data, b"{}");
        assert_eq!(got, version);
    }

    #[test]
    fn get_missing_is_no_node() {
        let conn = test_conn();
        let err = conn.get("/nope").unwrap_err();
        assert!(err.is_no_node());
    }

    #[test]
    fn create_twice_is_node_exists() {
        let conn = test_conn();
        conn.create("/a", b"1").unwrap();
        let err = conn.create("/a", b"2").unwrap_err();
        assert!(err.is_node_exists());
        assert_eq!(conn.get("/a").unwrap().0, b"1");
    }

    #[test]
    fn create_rejects_relative_path() {
        let conn = test_conn();
        assert!(matches!(
            conn.create("a/b", b"").unwrap_err(),
            TopoError::InvalidArgument(_)
        ));
    }

    // ── Compare-and-swap ───────────────────────────────────────────

    #[test]
    fn cas_with_current_version_succeeds() {
        let conn = test_conn();
        let v1 = conn.create("/a", b"1").unwrap();
        let v2 = conn.compare_and_swap("/a", Some(v1), b"2").unwrap();

        assert!(v2 > v1);
        assert_eq!(conn.get("/a").unwrap(), (b"2".to_vec(), v2));
    }

    #[test]
    fn cas_with_stale_version_conflicts() {
        let conn = test_conn();
        let v1 = conn.create("/a", b"1").unwrap();
        conn.compare_and_swap("/a", Some(v1), b"2").unwrap();

        let err = conn.compare_and_swap("/a", Some(v1), b"3").unwrap_err();
        assert!(err.is_bad_version());
        assert_eq!(conn.get("/a").unwrap().0, b"2");
    }

    #[test]
    fn cas_unconditional_creates_missing_node() {
        let conn = test_conn();
        conn.compare_and_swap("/a", None, b"1").unwrap();
        assert_eq!(conn.get("/a").unwrap().0, b"1");
    }

    #[test]
    fn cas_expecting_version_on_missing_node_is_no_node() {
        let conn = test_conn();
        let err = conn.compare_and_swap("/a", Some(1), b"1").unwrap_err();
        assert!(err.is_no_node());
    }

    #[test]
    fn versions_increase_across_recreate() {
        let conn = test_conn();
        let v1 = conn.create("/a", b"1").unwrap();
        conn.delete("/a").unwrap();
        let v2 = conn.create("/a", b"1").unwrap();
        assert!(v2 > v1);
    }

    // ── Delete ─────────────────────────────────────────────────────

    #[test]
    fn delete_then_missing() {
        let conn = test_conn();
        conn.create("/a", b"1").unwrap();

        conn.delete("/a").unwrap();
        assert!(conn.get("/a").unwrap_err().is_no_node());
        assert!(conn.delete("/a").unwrap_err().is_no_node());
    }

    #[test]
    fn delete_recursive_removes_subtree_only() {
        let conn = test_conn();
        conn.create("/keyspaces/ks/shards/0/Shard", b"").unwrap();
        conn.create("/keyspaces/ks/shards/0/extra", b"").unwrap();
        conn.create("/keyspaces/ks/shards/00/Shard", b"").unwrap();
        conn.create("/keyspaces/ks/Keyspace", b"").unwrap();

        let removed = conn.delete_recursive("/keyspaces/ks/shards/0").unwrap();
        assert_eq!(removed, 2);
        assert!(conn.get("/keyspaces/ks/shards/00/Shard").is_ok());
        assert!(conn.get("/keyspaces/ks/Keyspace").is_ok());
    }

    #[test]
    fn delete_recursive_on_empty_subtree_is_ok() {
        let conn = test_conn();
        assert_eq!(conn.delete_recursive("/nothing/here").unwrap(), 0);
    }

    // ── Glob ───────────────────────────────────────────────────────

    #[test]
    fn glob_is_lexicographic() {
        let conn = test_conn();
        conn.create("/keyspaces/ks2/Keyspace", b"2").unwrap();
        conn.create("/keyspaces/ks10/Keyspace", b"10").unwrap();
        conn.create("/keyspaces/ks1/Keyspace", b"1").unwrap();
        conn.create("/keyspaces/ks1/shards/0/Shard", b"s").unwrap();

        let entries = conn.get_glob("/keyspaces/*/Keyspace").unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/keyspaces/ks1/Keyspace",
                "/keyspaces/ks10/Keyspace",
                "/keyspaces/ks2/Keyspace",
            ]
        );
        assert!(entries.iter().all(|e| e.version > 0));
    }

    #[test]
    fn glob_reports_current_versions() {
        let conn = test_conn();
        let v1 = conn.create("/a/x", b"1").unwrap();
        let v2 = conn.compare_and_swap("/a/x", Some(v1), b"2").unwrap();

        let entries = conn.get_glob("/a/*").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version, v2);
        assert_eq!(entries[0].data, b"2");
    }

    #[test]
    fn glob_with_no_match_is_empty() {
        let conn = test_conn();
        conn.create("/a/x", b"1").unwrap();
        assert!(conn.get_glob("/b/*").unwrap().is_empty());
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("topo.redb");

        let version = {
            let conn = RedbConn::open(&db_path).unwrap();
            conn.create("/keyspaces/ks1/Keyspace", b"{}").unwrap()
        };

        let conn = RedbConn::open(&db_path).unwrap();
        let (_, reopened) = conn.get("/keyspaces/ks1/Keyspace").unwrap();
        assert_eq!(reopened, version);

        // The revision counter also survives, so new writes keep increasing.
        let next = conn.create("/keyspaces/ks2/Keyspace", b"{}").unwrap();
        assert!(next > version);
    }
}
