//! Shard records.

use tracing::{debug, info};

use crate::conn::Version;
use crate::error::{TopoError, TopoResult};
use crate::paths;
use crate::server::TopoServer;
use crate::types::Shard;

/// A shard record together with its identity and node version.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardInfo {
    pub keyspace: String,
    pub shard_name: String,
    pub shard: Shard,
    pub version: Version,
}

impl ShardInfo {
    pub fn is_serving(&self) -> bool {
        self.shard.is_serving()
    }
}

impl TopoServer {
    /// Create a shard in an existing keyspace.
    ///
    /// New shards have no primary and are marked serving, so they start
    /// taking traffic as soon as a primary is assigned.
    pub fn create_shard(&self, keyspace: &str, shard: &str) -> TopoResult<ShardInfo> {
        paths::validate_name("shard", shard).map_err(TopoError::InvalidArgument)?;
        self.get_keyspace(keyspace)?;

        let record = Shard {
            primary_alias: None,
            is_primary_serving: true,
        };
        let version = self.create_record(&paths::shard_path(keyspace, shard), &record)?;
        info!(%keyspace, %shard, "shard created");
        Ok(ShardInfo {
            keyspace: keyspace.to_string(),
            shard_name: shard.to_string(),
            shard: record,
            version,
        })
    }

    pub fn get_shard(&self, keyspace: &str, shard: &str) -> TopoResult<ShardInfo> {
        let (record, version) = self.get_record(&paths::shard_path(keyspace, shard))?;
        Ok(ShardInfo {
            keyspace: keyspace.to_string(),
            shard_name: shard.to_string(),
            shard: record,
            version,
        })
    }

    /// Apply `update` to a shard with compare-and-swap retry.
    pub fn update_shard_fields<F>(&self, keyspace: &str, shard: &str, update: F) -> TopoResult<ShardInfo>
    where
        F: FnMut(&mut Shard) -> TopoResult<bool>,
    {
        let (record, version) = self.update_node(&paths::shard_path(keyspace, shard), update)?;
        debug!(%keyspace, %shard, version, "shard updated");
        Ok(ShardInfo {
            keyspace: keyspace.to_string(),
            shard_name: shard.to_string(),
            shard: record,
            version,
        })
    }

    /// Delete the shard node and anything else stored under its directory.
    pub fn delete_shard(&self, keyspace: &str, shard: &str) -> TopoResult<()> {
        self.conn().delete(&paths::shard_path(keyspace, shard))?;
        let leftovers = self.conn().delete_recursive(&paths::shard_dir(keyspace, shard))?;
        info!(%keyspace, %shard, leftovers, "shard deleted");
        Ok(())
    }

    /// Names of all shards in a keyspace, sorted.
    pub fn get_shard_names(&self, keyspace: &str) -> TopoResult<Vec<String>> {
        self.child_names(&paths::shards_glob(keyspace))
    }
}
