//! The storage contract every topology backend implements.

use crate::error::TopoResult;

/// Opaque, strictly increasing node version.
///
/// Versions come from a store-wide revision counter, so they are only
/// meaningful for equality and relative ordering.
pub type Version = u64;

/// A node returned from a glob read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub version: Version,
}

/// Hierarchical, versioned key/value store.
///
/// All operations are linearizable per path. `NoNode` is an expected
/// outcome; any other failure is a store-availability fault and is
/// surfaced to the caller without retry.
pub trait Conn: Send + Sync {
    /// Read a single node.
    fn get(&self, path: &str) -> TopoResult<(Vec<u8>, Version)>;

    /// Read every node whose path matches `pattern`, sorted by path.
    fn get_glob(&self, pattern: &str) -> TopoResult<Vec<NodeEntry>>;

    /// Create a node that must not exist yet.
    fn create(&self, path: &str, data: &[u8]) -> TopoResult<Version>;

    /// Write a node if its current version matches `expected`.
    ///
    /// `None` writes unconditionally and creates the node when absent.
    /// `Some(v)` fails with `NoNode` when the node is absent and with
    /// `BadVersion` when it has been modified since `v` was read.
    fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<Version>,
        data: &[u8],
    ) -> TopoResult<Version>;

    /// Delete a single node.
    fn delete(&self, path: &str) -> TopoResult<()>;

    /// Delete `prefix` and every node below it. Returns the number of
    /// nodes removed; an empty subtree is not an error.
    fn delete_recursive(&self, prefix: &str) -> TopoResult<u32>;
}
