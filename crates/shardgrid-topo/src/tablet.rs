//! Tablet registry.
//!
//! Tablets are indexed per cell under `/cells/<cell>/tablets`. Registering
//! a tablet also lists it in its cell's replication record, but removal is
//! never cascaded: `delete_tablet` and `delete_shard_replication` are
//! separate operations and the caller decides which to run.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::conn::Version;
use crate::error::{TopoError, TopoResult};
use crate::paths;
use crate::server::TopoServer;
use crate::types::{Tablet, TabletAlias};

/// A tablet record together with its node version.
#[derive(Debug, Clone, PartialEq)]
pub struct TabletInfo {
    pub tablet: Tablet,
    pub version: Version,
}

impl TabletInfo {
    pub fn alias(&self) -> &TabletAlias {
        &self.tablet.alias
    }
}

impl TopoServer {
    /// Register a tablet in its cell and add it to the replication record.
    pub fn register_tablet(&self, tablet: &Tablet) -> TopoResult<TabletInfo> {
        paths::validate_name("keyspace", &tablet.keyspace).map_err(TopoError::InvalidArgument)?;
        paths::validate_name("shard", &tablet.shard).map_err(TopoError::InvalidArgument)?;
        self.get_cell_info(&tablet.alias.cell).map_err(|e| match e {
            TopoError::NoNode(_) => {
                TopoError::InvalidArgument(format!("unknown cell {:?}", tablet.alias.cell))
            }
            other => other,
        })?;

        let version = self.create_record(&paths::tablet_path(&tablet.alias), tablet)?;
        self.add_shard_replication_record(&tablet.keyspace, &tablet.shard, &tablet.alias)?;
        info!(
            alias = %tablet.alias,
            keyspace = %tablet.keyspace,
            shard = %tablet.shard,
            tablet_type = %tablet.tablet_type,
            "tablet registered"
        );
        Ok(TabletInfo {
            tablet: tablet.clone(),
            version,
        })
    }

    pub fn get_tablet(&self, alias: &TabletAlias) -> TopoResult<TabletInfo> {
        let (tablet, version) = self.get_record(&paths::tablet_path(alias))?;
        Ok(TabletInfo { tablet, version })
    }

    /// Apply `update` to a tablet with compare-and-swap retry.
    pub fn update_tablet_fields<F>(&self, alias: &TabletAlias, update: F) -> TopoResult<TabletInfo>
    where
        F: FnMut(&mut Tablet) -> TopoResult<bool>,
    {
        let (tablet, version) = self.update_node(&paths::tablet_path(alias), update)?;
        Ok(TabletInfo { tablet, version })
    }

    /// Deregister a tablet. Replication records are left untouched.
    pub fn delete_tablet(&self, alias: &TabletAlias) -> TopoResult<()> {
        self.conn().delete(&paths::tablet_path(alias))?;
        info!(%alias, "tablet deregistered");
        Ok(())
    }

    /// Aliases of every tablet registered in `cell`, sorted.
    pub fn get_tablet_aliases_by_cell(&self, cell: &str) -> TopoResult<Vec<TabletAlias>> {
        let names = self.child_names(&paths::tablets_glob(cell))?;
        let mut aliases = Vec::with_capacity(names.len());
        for name in names {
            match name.parse::<TabletAlias>() {
                Ok(alias) => aliases.push(alias),
                Err(e) => warn!(%cell, error = %e, "skipping malformed tablet entry"),
            }
        }
        Ok(aliases)
    }

    /// Every tablet registered in `cell`.
    pub fn get_tablets_by_cell(&self, cell: &str) -> TopoResult<Vec<TabletInfo>> {
        let entries = self.conn().get_glob(&paths::tablets_glob(cell))?;
        entries
            .into_iter()
            .map(|e| {
                let tablet = crate::codec::decode(&e.path, &e.data)?;
                Ok(TabletInfo {
                    tablet,
                    version: e.version,
                })
            })
            .collect()
    }

    /// Every tablet of a shard across all cells, sorted by alias.
    ///
    /// Each cell's replication record is used as the index. When a cell
    /// has no record the whole cell is scanned instead, and aliases listed
    /// in a record whose tablet no longer exists are skipped.
    pub fn list_tablets(&self, keyspace: &str, shard: &str) -> TopoResult<Vec<TabletInfo>> {
        let mut aliases = BTreeSet::new();
        for cell in self.get_cell_info_names()? {
            match self.get_shard_replication(&cell, keyspace, shard) {
                Ok(sri) => aliases.extend(sri.replication.nodes),
                Err(e) if e.is_no_node() => {
                    debug!(%cell, %keyspace, %shard, "no replication record, scanning cell");
                    for info in self.get_tablets_by_cell(&cell)? {
                        if info.tablet.keyspace == keyspace && info.tablet.shard == shard {
                            aliases.insert(info.tablet.alias);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let mut tablets = Vec::with_capacity(aliases.len());
        for alias in aliases {
            match self.get_tablet(&alias) {
                Ok(info) if info.tablet.keyspace == keyspace && info.tablet.shard == shard => {
                    tablets.push(info)
                }
                Ok(_) => debug!(%alias, "replication record points at a tablet of another shard"),
                Err(e) if e.is_no_node() => debug!(%alias, "stale replication entry"),
                Err(e) => return Err(e),
            }
        }
        Ok(tablets)
    }
}
