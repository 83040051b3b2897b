//! Domain records stored in the topology.
//!
//! All records are JSON-serialized into node payloads. Missing fields
//! deserialize to their defaults so older payloads stay readable.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use shardgrid_core::TabletAlias;

// ── Keyspace ───────────────────────────────────────────────────────

/// Replication semantics of a keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyspaceType {
    #[default]
    Normal,
    Snapshot,
}

impl fmt::Display for KeyspaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyspaceType::Normal => "NORMAL",
            KeyspaceType::Snapshot => "SNAPSHOT",
        })
    }
}

/// A logical database spanning one or more shards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyspace {
    pub keyspace_type: KeyspaceType,
}

// ── Shard ──────────────────────────────────────────────────────────

/// A horizontal partition of a keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Shard {
    /// Tablet currently acting as primary, if any.
    pub primary_alias: Option<TabletAlias>,
    /// Whether the primary is allowed to take traffic.
    pub is_primary_serving: bool,
}

impl Shard {
    /// A shard is serving when it has a primary marked serving.
    pub fn is_serving(&self) -> bool {
        self.primary_alias.is_some() && self.is_primary_serving
    }
}

// ── Tablet ─────────────────────────────────────────────────────────

/// Role a tablet plays in its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabletType {
    Primary,
    #[default]
    Replica,
    Rdonly,
    Spare,
    Drained,
}

impl fmt::Display for TabletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TabletType::Primary => "PRIMARY",
            TabletType::Replica => "REPLICA",
            TabletType::Rdonly => "RDONLY",
            TabletType::Spare => "SPARE",
            TabletType::Drained => "DRAINED",
        })
    }
}

impl std::str::FromStr for TabletType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PRIMARY" => Ok(TabletType::Primary),
            "REPLICA" => Ok(TabletType::Replica),
            "RDONLY" => Ok(TabletType::Rdonly),
            "SPARE" => Ok(TabletType::Spare),
            "DRAINED" => Ok(TabletType::Drained),
            other => Err(format!("unknown tablet type {other:?}")),
        }
    }
}

/// A single managed database server instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tablet {
    pub alias: TabletAlias,
    pub hostname: String,
    /// Port of the tablet's management endpoint.
    pub port: u16,
    pub keyspace: String,
    pub shard: String,
    #[serde(default)]
    pub tablet_type: TabletType,
}

impl Tablet {
    /// Network address used to reach the tablet's action loop.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

// ── Replication ────────────────────────────────────────────────────

/// Per-cell index of the tablets replicating one shard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardReplication {
    pub nodes: Vec<TabletAlias>,
}

impl ShardReplication {
    /// Add an alias, keeping the list sorted and free of duplicates.
    /// Returns false if the alias was already present.
    pub fn add(&mut self, alias: &TabletAlias) -> bool {
        match self.nodes.binary_search(alias) {
            Ok(_) => false,
            Err(pos) => {
                self.nodes.insert(pos, alias.clone());
                true
            }
        }
    }

    /// Remove an alias. Returns false if it was not present.
    pub fn remove(&mut self, alias: &TabletAlias) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|a| a != alias);
        self.nodes.len() != before
    }
}

// ── Cell ───────────────────────────────────────────────────────────

/// A failure domain holding tablets and their replication records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellInfo {
    pub server_address: String,
    pub root: String,
}
