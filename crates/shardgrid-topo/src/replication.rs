//! Per-cell replication records.
//!
//! A replication record lists the tablets of one shard in one cell so
//! replication-topology queries don't need to scan every tablet. Records
//! are maintained alongside tablet registration but deleted independently:
//! they may be missing or stale, and readers must tolerate both.

use tracing::{debug, info};

use crate::conn::Version;
use crate::error::TopoResult;
use crate::paths;
use crate::server::TopoServer;
use crate::types::{ShardReplication, TabletAlias};

/// A replication record together with its location and node version.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardReplicationInfo {
    pub cell: String,
    pub keyspace: String,
    pub shard: String,
    pub replication: ShardReplication,
    pub version: Version,
}

impl TopoServer {
    pub fn get_shard_replication(
        &self,
        cell: &str,
        keyspace: &str,
        shard: &str,
    ) -> TopoResult<ShardReplicationInfo> {
        let (replication, version) =
            self.get_record(&paths::shard_replication_path(cell, keyspace, shard))?;
        Ok(ShardReplicationInfo {
            cell: cell.to_string(),
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
            replication,
            version,
        })
    }

    /// Apply `update` to a replication record, creating it when absent.
    pub fn update_shard_replication_fields<F>(
        &self,
        cell: &str,
        keyspace: &str,
        shard: &str,
        mut update: F,
    ) -> TopoResult<()>
    where
        F: FnMut(&mut ShardReplication) -> TopoResult<bool>,
    {
        let path = paths::shard_replication_path(cell, keyspace, shard);
        loop {
            match self.update_node::<ShardReplication, _>(&path, &mut update) {
                Ok(_) => return Ok(()),
                Err(e) if e.is_no_node() => {
                    let mut record = ShardReplication::default();
                    if !update(&mut record)? {
                        return Ok(());
                    }
                    match self.create_record(&path, &record) {
                        Ok(_) => return Ok(()),
                        // Someone else created it first; merge into theirs.
                        Err(e) if e.is_node_exists() => continue,
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Add a tablet to its cell's replication record for a shard.
    pub fn add_shard_replication_record(
        &self,
        keyspace: &str,
        shard: &str,
        alias: &TabletAlias,
    ) -> TopoResult<()> {
        self.update_shard_replication_fields(&alias.cell, keyspace, shard, |record| {
            Ok(record.add(alias))
        })
    }

    /// Remove a tablet from its cell's replication record for a shard.
    ///
    /// A missing record is treated as already clean.
    pub fn remove_shard_replication_record(
        &self,
        keyspace: &str,
        shard: &str,
        alias: &TabletAlias,
    ) -> TopoResult<()> {
        let path = paths::shard_replication_path(&alias.cell, keyspace, shard);
        match self.update_node::<ShardReplication, _>(&path, |record| Ok(record.remove(alias))) {
            Ok(_) => Ok(()),
            Err(e) if e.is_no_node() => {
                debug!(%keyspace, %shard, %alias, "no replication record to remove from");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a shard's replication record in one cell.
    pub fn delete_shard_replication(&self, cell: &str, keyspace: &str, shard: &str) -> TopoResult<()> {
        self.conn()
            .delete(&paths::shard_replication_path(cell, keyspace, shard))?;
        info!(%cell, %keyspace, %shard, "replication record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_topo() -> TopoServer {
        TopoServer::open_in_memory(&["cell1", "cell2"]).unwrap()
    }

    #[test]
    fn add_creates_record() {
        let ts = test_topo();
        ts.add_shard_replication_record("ks", "0", &TabletAlias::new("cell1", 1))
            .unwrap();
        ts.add_shard_replication_record("ks", "0", &TabletAlias::new("cell1", 0))
            .unwrap();

        let sri = ts.get_shard_replication("cell1", "ks", "0").unwrap();
        assert_eq!(
            sri.replication.nodes,
            vec![TabletAlias::new("cell1", 0), TabletAlias::new("cell1", 1)]
        );
        assert!(ts.get_shard_replication("cell2", "ks", "0").unwrap_err().is_no_node());
    }

    #[test]
    fn remove_from_missing_record_is_ok() {
        let ts = test_topo();
        ts.remove_shard_replication_record("ks", "0", &TabletAlias::new("cell1", 1))
            .unwrap();
    }

    #[test]
    fn remove_keeps_other_tablets() {
        let ts = test_topo();
        ts.add_shard_replication_record("ks", "0", &TabletAlias::new("cell1", 0))
            .unwrap();
        ts.add_shard_replication_record("ks", "0", &TabletAlias::new("cell1", 1))
            .unwrap();

        ts.remove_shard_replication_record("ks", "0", &TabletAlias::new("cell1", 0))
            .unwrap();
        let sri = ts.get_shard_replication("cell1", "ks", "0").unwrap();
        assert_eq!(sri.replication.nodes, vec![TabletAlias::new("cell1", 1)]);
    }

    #[test]
    fn delete_record_and_missing_record() {
        let ts = test_topo();
        ts.add_shard_replication_record("ks", "0", &TabletAlias::new("cell2", 2))
            .unwrap();

        ts.delete_shard_replication("cell2", "ks", "0").unwrap();
        assert!(ts.get_shard_replication("cell2", "ks", "0").unwrap_err().is_no_node());
        assert!(ts.delete_shard_replication("cell2", "ks", "0").unwrap_err().is_no_node());
    }

    #[test]
    fn update_that_declines_does_not_create() {
        let ts = test_topo();
        ts.update_shard_replication_fields("cell1", "ks", "0", |_| Ok(false))
            .unwrap();
        assert!(ts.get_shard_replication("cell1", "ks", "0").unwrap_err().is_no_node());
    }
}
