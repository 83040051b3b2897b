//! redb table definitions for the topology store.
//!
//! Node payloads and node versions live in separate tables keyed by the
//! full node path, so a prefix range scan over `NODES` yields children in
//! lexicographic order.

use redb::TableDefinition;

/// Raw node payloads keyed by absolute path.
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Current version of each node, keyed by absolute path.
pub const VERSIONS: TableDefinition<&str, u64> = TableDefinition::new("versions");

/// Store-wide counters.
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Key in `META` holding the last handed-out revision.
pub const REVISION_KEY: &str = "revision";
