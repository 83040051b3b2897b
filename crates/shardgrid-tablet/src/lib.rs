//! shardgrid-tablet — the tablet end of control-plane calls.
//!
//! Each tablet runs one action loop: a tokio task draining an ordered
//! command channel, so commands addressed to one tablet execute one at a
//! time while different tablets proceed in parallel. The
//! [`TabletManagerClient`] reaches those loops by the network address
//! recorded in the topology and bounds every call with a timeout.
//!
//! Grant tables are read through the [`MysqlDaemon`] trait and compared
//! with [`diff_permissions`].

pub mod action_loop;
pub mod client;
pub mod daemon;
pub mod error;
pub mod permissions;

pub use action_loop::{TabletCommand, TabletHandle, spawn_action_loop};
pub use client::TabletManagerClient;
pub use daemon::{MemoryDaemon, MysqlDaemon};
pub use error::{TabletError, TabletResult};
pub use permissions::{
    PermissionDiff, PermissionSnapshot, PermissionTable, TableSnapshot, diff_permissions,
};
