//! Tablet initialization and removal.

use tracing::{debug, info};

use shardgrid_topo::{Keyspace, Tablet, TabletAlias, TabletInfo, TabletType};

use crate::error::{WranglerError, WranglerResult};
use crate::wrangler::Wrangler;

/// Flags for [`Wrangler::init_tablet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InitTabletOptions {
    /// Overwrite an existing record for the same alias and shard.
    pub allow_update: bool,
    /// Create the keyspace and shard if they don't exist yet.
    pub create_shard_and_keyspace: bool,
    /// Let a new primary replace the shard's current one.
    pub allow_primary_override: bool,
}

impl Wrangler {
    /// Register a tablet, and make it the shard primary if it is one.
    pub fn init_tablet(&self, tablet: &Tablet, options: InitTabletOptions) -> WranglerResult<TabletInfo> {
        let ts = self.ts();
        if options.create_shard_and_keyspace {
            self.ensure_shard(&tablet.keyspace, &tablet.shard)?;
        }

        let si = ts.get_shard(&tablet.keyspace, &tablet.shard)?;
        if tablet.tablet_type == TabletType::Primary {
            if let Some(primary) = &si.shard.primary_alias {
                if primary != &tablet.alias && !options.allow_primary_override {
                    return Err(WranglerError::PrimaryExists {
                        keyspace: tablet.keyspace.clone(),
                        shard: tablet.shard.clone(),
                        primary: primary.clone(),
                    });
                }
            }
        }

        let info = match ts.register_tablet(tablet) {
            Ok(info) => info,
            Err(e) if e.is_node_exists() && options.allow_update => self.replace_tablet(tablet)?,
            Err(e) => return Err(e.into()),
        };

        if tablet.tablet_type == TabletType::Primary {
            let alias = tablet.alias.clone();
            ts.update_shard_fields(&tablet.keyspace, &tablet.shard, |shard| {
                if shard.primary_alias.as_ref() == Some(&alias) {
                    return Ok(false);
                }
                shard.primary_alias = Some(alias.clone());
                Ok(true)
            })?;
            info!(keyspace = %tablet.keyspace, shard = %tablet.shard, primary = %tablet.alias, "shard primary assigned");
        }
        Ok(info)
    }

    /// Deregister a tablet and drop it from its replication record.
    ///
    /// Primaries are refused unless `allow_primary` is set, in which case
    /// the shard loses its primary as well.
    pub fn delete_tablet(&self, alias: &TabletAlias, allow_primary: bool) -> WranglerResult<()> {
        let ts = self.ts();
        let tablet = ts.get_tablet(alias)?.tablet;
        let is_primary = tablet.tablet_type == TabletType::Primary;
        if is_primary && !allow_primary {
            return Err(WranglerError::PrimaryTablet(alias.clone()));
        }

        ts.delete_tablet(alias)?;
        ts.remove_shard_replication_record(&tablet.keyspace, &tablet.shard, alias)?;

        if is_primary {
            match ts.update_shard_fields(&tablet.keyspace, &tablet.shard, |shard| {
                if shard.primary_alias.as_ref() != Some(alias) {
                    return Ok(false);
                }
                shard.primary_alias = None;
                Ok(true)
            }) {
                Ok(_) => {}
                Err(e) if e.is_no_node() => debug!(%alias, "shard already gone"),
                Err(e) => return Err(e.into()),
            }
        }
        info!(%alias, "tablet deleted");
        Ok(())
    }

    fn ensure_shard(&self, keyspace: &str, shard: &str) -> WranglerResult<()> {
        let ts = self.ts();
        match ts.create_keyspace(keyspace, &Keyspace::default()) {
            Ok(_) => {}
            Err(e) if e.is_node_exists() => {}
            Err(e) => return Err(e.into()),
        }
        match ts.create_shard(keyspace, shard) {
            Ok(_) => Ok(()),
            Err(e) if e.is_node_exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn replace_tablet(&self, tablet: &Tablet) -> WranglerResult<TabletInfo> {
        let ts = self.ts();
        let existing = ts.get_tablet(&tablet.alias)?.tablet;
        if existing.keyspace != tablet.keyspace || existing.shard != tablet.shard {
            return Err(WranglerError::TabletMoved {
                alias: tablet.alias.clone(),
                existing: format!("{}/{}", existing.keyspace, existing.shard),
                requested: format!("{}/{}", tablet.keyspace, tablet.shard),
            });
        }
        let info = ts.update_tablet_fields(&tablet.alias, |current| {
            if *current == *tablet {
                return Ok(false);
            }
            *current = tablet.clone();
            Ok(true)
        })?;
        ts.add_shard_replication_record(&tablet.keyspace, &tablet.shard, &tablet.alias)?;
        debug!(alias = %tablet.alias, "tablet record updated");
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardgrid_tablet::TabletManagerClient;
    use shardgrid_topo::TopoServer;

    fn test_wrangler() -> Wrangler {
        let ts = TopoServer::open_in_memory(&["cell1"]).unwrap();
        Wrangler::new(ts, TabletManagerClient::new())
    }

    fn test_tablet(uid: u32, tablet_type: TabletType) -> Tablet {
        Tablet {
            alias: TabletAlias::new("cell1", uid),
            hostname: "localhost".to_string(),
            port: 15000 + uid as u16,
            keyspace: "ks".to_string(),
            shard: "0".to_string(),
            tablet_type,
        }
    }

    fn create_all() -> InitTabletOptions {
        InitTabletOptions {
            create_shard_and_keyspace: true,
            ..Default::default()
        }
    }

    #[test]
    fn init_requires_shard_without_create_flag() {
        let wr = test_wrangler();
        let err = wr
            .init_tablet(&test_tablet(0, TabletType::Replica), InitTabletOptions::default())
            .unwrap_err();
        assert!(matches!(err, WranglerError::Topo(e) if e.is_no_node()));
    }

    #[test]
    fn primary_becomes_shard_primary() {
        let wr = test_wrangler();
        wr.init_tablet(&test_tablet(0, TabletType::Primary), create_all())
            .unwrap();

        let si = wr.ts().get_shard("ks", "0").unwrap();
        assert_eq!(si.shard.primary_alias, Some(TabletAlias::new("cell1", 0)));
        assert!(si.is_serving());
    }

    #[test]
    fn second_primary_needs_override() {
        let wr = test_wrangler();
        wr.init_tablet(&test_tablet(0, TabletType::Primary), create_all())
            .unwrap();

        let err = wr
            .init_tablet(&test_tablet(1, TabletType::Primary), create_all())
            .unwrap_err();
        assert!(matches!(err, WranglerError::PrimaryExists { .. }));

        let options = InitTabletOptions {
            allow_primary_override: true,
            ..create_all()
        };
        wr.init_tablet(&test_tablet(1, TabletType::Primary), options)
            .unwrap();
        assert_eq!(
            wr.ts().get_shard("ks", "0").unwrap().shard.primary_alias,
            Some(TabletAlias::new("cell1", 1))
        );
    }

    #[test]
    fn allow_update_replaces_record() {
        let wr = test_wrangler();
        wr.init_tablet(&test_tablet(1, TabletType::Replica), create_all())
            .unwrap();
        assert!(matches!(
            wr.init_tablet(&test_tablet(1, TabletType::Rdonly), create_all()),
            Err(WranglerError::Topo(e)) if e.is_node_exists()
        ));

        let options = InitTabletOptions {
            allow_update: true,
            ..create_all()
        };
        wr.init_tablet(&test_tablet(1, TabletType::Rdonly), options)
            .unwrap();
        assert_eq!(
            wr.ts().get_tablet(&TabletAlias::new("cell1", 1)).unwrap().tablet.tablet_type,
            TabletType::Rdonly
        );
    }

    #[test]
    fn allow_update_refuses_shard_move() {
        let wr = test_wrangler();
        wr.init_tablet(&test_tablet(1, TabletType::Replica), create_all())
            .unwrap();

        let mut moved = test_tablet(1, TabletType::Replica);
        moved.shard = "1".to_string();
        let options = InitTabletOptions {
            allow_update: true,
            ..create_all()
        };
        assert!(matches!(
            wr.init_tablet(&moved, options),
            Err(WranglerError::TabletMoved { .. })
        ));
    }

    #[test]
    fn delete_primary_needs_flag() {
        let wr = test_wrangler();
        wr.init_tablet(&test_tablet(0, TabletType::Primary), create_all())
            .unwrap();
        let alias = TabletAlias::new("cell1", 0);

        assert!(matches!(
            wr.delete_tablet(&alias, false),
            Err(WranglerError::PrimaryTablet(_))
        ));

        wr.delete_tablet(&alias, true).unwrap();
        assert!(wr.ts().get_tablet(&alias).unwrap_err().is_no_node());
        let si = wr.ts().get_shard("ks", "0").unwrap();
        assert!(si.shard.primary_alias.is_none());
        assert!(
            wr.ts()
                .get_shard_replication("cell1", "ks", "0")
                .unwrap()
                .replication
                .nodes
                .is_empty()
        );
    }
}
