//! Guarded shard deletion.

use tracing::{debug, info, warn};

use crate::error::{WranglerError, WranglerResult};
use crate::wrangler::Wrangler;

/// Flags relaxing the guards of [`Wrangler::delete_shard`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteShardOptions {
    /// Delete the shard even if it is serving traffic.
    pub even_if_serving: bool,
    /// Tear down the shard's tablets instead of refusing.
    pub recursive: bool,
}

impl Wrangler {
    /// Delete a shard and, with `recursive`, everything registered for it.
    ///
    /// The serving and occupancy guards run before any mutation. After
    /// that the steps are: stop and deregister every tablet, drop the
    /// replication record in every cell, delete the shard node. A failure
    /// aborts without undoing earlier steps; re-running the command
    /// resumes where it stopped.
    pub async fn delete_shard(
        &self,
        keyspace: &str,
        shard: &str,
        options: DeleteShardOptions,
    ) -> WranglerResult<()> {
        let si = self.ts().get_shard(keyspace, shard)?;
        if si.is_serving() && !options.even_if_serving {
            return Err(WranglerError::StillServing {
                keyspace: keyspace.to_string(),
                shard: shard.to_string(),
            });
        }

        let tablets = self.ts().list_tablets(keyspace, shard)?;
        if !tablets.is_empty() && !options.recursive {
            return Err(WranglerError::ShardOccupied {
                keyspace: keyspace.to_string(),
                shard: shard.to_string(),
                tablets: tablets.len(),
            });
        }

        for info in &tablets {
            let tablet = &info.tablet;
            info!(%keyspace, %shard, alias = %tablet.alias, "tearing down tablet");
            // A tablet that can't be reached is already out of service.
            if let Err(e) = self.tmc().stop(tablet).await {
                warn!(alias = %tablet.alias, error = %e, "could not stop tablet, deregistering anyway");
            }
            match self.ts().delete_tablet(&tablet.alias) {
                Ok(()) => {}
                Err(e) if e.is_no_node() => debug!(alias = %tablet.alias, "tablet already deregistered"),
                Err(e) => return Err(e.into()),
            }
        }

        for cell in self.ts().get_cell_info_names()? {
            match self.ts().delete_shard_replication(&cell, keyspace, shard) {
                Ok(()) => {}
                Err(e) if e.is_no_node() => {
                    debug!(%cell, %keyspace, %shard, "no replication record to delete")
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.ts().delete_shard(keyspace, shard)?;
        info!(%keyspace, %shard, tablets = tablets.len(), "shard deleted");
        Ok(())
    }
}
