//! Deterministic node paths for every topology record.

use shardgrid_core::TabletAlias;

pub const KEYSPACES_PATH: &str = "/keyspaces";
pub const CELLS_PATH: &str = "/cells";

pub const KEYSPACE_FILE: &str = "Keyspace";
pub const SHARD_FILE: &str = "Shard";
pub const TABLET_FILE: &str = "Tablet";
pub const SHARD_REPLICATION_FILE: &str = "ShardReplication";
pub const CELL_INFO_FILE: &str = "CellInfo";

pub fn keyspace_path(keyspace: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/{KEYSPACE_FILE}")
}

pub fn shard_dir(keyspace: &str, shard: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/shards/{shard}")
}

pub fn shard_path(keyspace: &str, shard: &str) -> String {
    format!("{}/{SHARD_FILE}", shard_dir(keyspace, shard))
}

pub fn shards_glob(keyspace: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/shards/*/{SHARD_FILE}")
}

pub fn keyspaces_glob() -> String {
    format!("{KEYSPACES_PATH}/*/{KEYSPACE_FILE}")
}

pub fn cell_info_path(cell: &str) -> String {
    format!("{CELLS_PATH}/{cell}/{CELL_INFO_FILE}")
}

pub fn cells_glob() -> String {
    format!("{CELLS_PATH}/*/{CELL_INFO_FILE}")
}

pub fn tablet_path(alias: &TabletAlias) -> String {
    format!("{CELLS_PATH}/{}/tablets/{alias}/{TABLET_FILE}", alias.cell)
}

pub fn tablets_glob(cell: &str) -> String {
    format!("{CELLS_PATH}/{cell}/tablets/*/{TABLET_FILE}")
}

pub fn shard_replication_path(cell: &str, keyspace: &str, shard: &str) -> String {
    format!("{CELLS_PATH}/{cell}/keyspaces/{keyspace}/shards/{shard}/{SHARD_REPLICATION_FILE}")
}

/// The component of `path` just before its final file name,
/// e.g. `ks1` for `/keyspaces/ks1/Keyspace`.
pub fn parent_name(path: &str) -> Option<&str> {
    let (dir, _) = path.rsplit_once('/')?;
    let (_, name) = dir.rsplit_once('/')?;
    (!name.is_empty()).then_some(name)
}

/// Reject names that would break the path layout.
pub fn validate_name(kind: &str, name: &str) -> Result<(), String> {
    if name.is_empty() || name.contains('/') || name.contains(['*', '?']) {
        Err(format!("invalid {kind} name {name:?}"))
    } else {
        Ok(())
    }
}
