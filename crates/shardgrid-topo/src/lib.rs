//! shardgrid-topo — versioned topology store and tablet registry.
//!
//! Backed by [redb](https://docs.rs/redb). Every topology record lives
//! in a single hierarchical namespace of `/`-separated paths; each node
//! carries an opaque version drawn from a store-wide revision counter.
//!
//! # Architecture
//!
//! ```text
//! TopoServer (typed records, CAS retry loop)
//!   ├── keyspace / shard     /keyspaces/<ks>/...
//!   ├── tablet registry      /cells/<cell>/tablets/<alias>/Tablet
//!   └── replication records  /cells/<cell>/keyspaces/<ks>/shards/<shard>/ShardReplication
//!         │
//!         ▼
//! Arc<dyn Conn>  get / get_glob / create / compare_and_swap / delete
//!   └── RedbConn (on-disk or in-memory)
//! ```
//!
//! Payloads are JSON-serialized domain types; `codec` can render them in a
//! compact text form for display.

pub mod codec;
pub mod conn;
pub mod error;
pub mod glob;
pub mod keyspace;
pub mod paths;
pub mod replication;
pub mod server;
pub mod shard;
pub mod store;
pub mod tables;
pub mod tablet;
pub mod types;

pub use conn::{Conn, NodeEntry, Version};
pub use error::{TopoError, TopoResult};
pub use keyspace::KeyspaceInfo;
pub use replication::ShardReplicationInfo;
pub use server::TopoServer;
pub use shard::ShardInfo;
pub use store::RedbConn;
pub use tablet::TabletInfo;
pub use types::*;
