//! Shared fixtures: an in-memory topology plus fake tablets whose action
//! loops really run and answer from a `MemoryDaemon`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use shardgrid_tablet::{
    MemoryDaemon, PermissionSnapshot, TableSnapshot, TabletHandle, TabletManagerClient,
    spawn_action_loop,
};
use shardgrid_topo::{Tablet, TabletAlias, TabletType, TopoServer};
use shardgrid_wrangler::{InitTabletOptions, Wrangler};

pub struct TestEnv {
    pub ts: TopoServer,
    pub tmc: TabletManagerClient,
    pub wr: Wrangler,
}

pub struct FakeTablet {
    pub tablet: Tablet,
    pub daemon: Arc<MemoryDaemon>,
    pub handle: TabletHandle,
    pub task: JoinHandle<()>,
}

impl FakeTablet {
    pub fn alias(&self) -> &TabletAlias {
        &self.tablet.alias
    }
}

pub fn test_env(cells: &[&str]) -> TestEnv {
    let ts = TopoServer::open_in_memory(cells).unwrap();
    let tmc = TabletManagerClient::new().with_timeout(Duration::from_secs(1));
    let wr = Wrangler::new(ts.clone(), tmc.clone())
        .with_tablet_retry_delay(Duration::from_millis(5))
        .with_tablet_retry_attempts(2);
    TestEnv { ts, tmc, wr }
}

impl TestEnv {
    /// Register a tablet (creating its keyspace and shard as needed),
    /// start its action loop and make it reachable through the client.
    pub async fn new_fake_tablet(
        &self,
        cell: &str,
        uid: u32,
        tablet_type: TabletType,
        keyspace: &str,
        shard: &str,
    ) -> FakeTablet {
        let tablet = Tablet {
            alias: TabletAlias::new(cell, uid),
            hostname: format!("{cell}-host{uid}"),
            port: 15000 + (uid % 1000) as u16,
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
            tablet_type,
        };
        let options = InitTabletOptions {
            create_shard_and_keyspace: true,
            ..Default::default()
        };
        self.wr.init_tablet(&tablet, options).unwrap();

        let daemon = Arc::new(MemoryDaemon::with_permissions(default_permissions()));
        let (handle, task) = spawn_action_loop(tablet.alias.clone(), daemon.clone());
        self.tmc.register(&tablet.addr(), handle.clone()).await;

        FakeTablet {
            tablet,
            daemon,
            handle,
            task,
        }
    }
}

pub fn user_table() -> TableSnapshot {
    TableSnapshot::new(["Host", "User", "Password", "Select_priv", "Insert_priv"])
        .with_row(["%", "vt_app", "*4ACFE3202A5FF5CF467898FC58AAB1D615029441", "Y", "Y"])
        .with_row(["localhost", "vt_dba", "", "Y", "Y"])
        .with_row(["localhost", "vt_repl", "", "N", "N"])
}

pub fn db_table() -> TableSnapshot {
    TableSnapshot::new(["Host", "Db", "User", "Select_priv", "Insert_priv"])
        .with_row(["%", "vt_ks", "vt_app", "Y", "Y"])
        .with_row(["localhost", "vt_ks", "vt_dba", "Y", "Y"])
}

pub fn default_permissions() -> PermissionSnapshot {
    PermissionSnapshot {
        user: user_table(),
        db: db_table(),
    }
}
