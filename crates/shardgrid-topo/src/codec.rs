//! Payload encoding and human-readable decoding of topology nodes.
//!
//! Nodes hold JSON-serialized records. For display, `decode_text` picks
//! the record type from the node's file name and renders only the fields
//! that differ from their defaults, one `name:value` pair per line.

use std::fmt::Write as _;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{TopoError, TopoResult};
use crate::paths;
use crate::types::*;

pub fn encode<T: Serialize>(value: &T) -> TopoResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| TopoError::Serialize(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(path: &str, data: &[u8]) -> TopoResult<T> {
    serde_json::from_slice(data).map_err(|e| TopoError::Deserialize {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Record type stored at a path, derived from its final component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Keyspace,
    Shard,
    Tablet,
    ShardReplication,
    CellInfo,
}

impl NodeKind {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.rsplit('/').next()? {
            paths::KEYSPACE_FILE => Some(NodeKind::Keyspace),
            paths::SHARD_FILE => Some(NodeKind::Shard),
            paths::TABLET_FILE => Some(NodeKind::Tablet),
            paths::SHARD_REPLICATION_FILE => Some(NodeKind::ShardReplication),
            paths::CELL_INFO_FILE => Some(NodeKind::CellInfo),
            _ => None,
        }
    }
}

/// Compact text rendering of a record.
pub trait TextFormat {
    /// Append one `name:value\n` line per non-default field.
    fn write_text(&self, out: &mut String);

    fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }
}

/// Decode a node payload and render it as text.
///
/// Payloads at paths with no known record type are returned as lossy
/// UTF-8 text.
pub fn decode_text(path: &str, data: &[u8]) -> TopoResult<String> {
    let text = match NodeKind::from_path(path) {
        Some(NodeKind::Keyspace) => decode::<Keyspace>(path, data)?.to_text(),
        Some(NodeKind::Shard) => decode::<Shard>(path, data)?.to_text(),
        Some(NodeKind::Tablet) => decode::<Tablet>(path, data)?.to_text(),
        Some(NodeKind::ShardReplication) => decode::<ShardReplication>(path, data)?.to_text(),
        Some(NodeKind::CellInfo) => decode::<CellInfo>(path, data)?.to_text(),
        None => String::from_utf8_lossy(data).into_owned(),
    };
    Ok(text)
}

fn alias_text(alias: &TabletAlias) -> String {
    format!("{{cell:{:?} uid:{}}}", alias.cell, alias.uid)
}

impl TextFormat for Keyspace {
    fn write_text(&self, out: &mut String) {
        if self.keyspace_type != KeyspaceType::Normal {
            let _ = writeln!(out, "keyspace_type:{}", self.keyspace_type);
        }
    }
}

impl TextFormat for Shard {
    fn write_text(&self, out: &mut String) {
        if let Some(alias) = &self.primary_alias {
            let _ = writeln!(out, "primary_alias:{}", alias_text(alias));
        }
        if self.is_primary_serving {
            let _ = writeln!(out, "is_primary_serving:true");
        }
    }
}

impl TextFormat for Tablet {
    fn write_text(&self, out: &mut String) {
        let _ = writeln!(out, "alias:{}", alias_text(&self.alias));
        if !self.hostname.is_empty() {
            let _ = writeln!(out, "hostname:{:?}", self.hostname);
        }
        if self.port != 0 {
            let _ = writeln!(out, "port:{}", self.port);
        }
        if !self.keyspace.is_empty() {
            let _ = writeln!(out, "keyspace:{:?}", self.keyspace);
        }
        if !self.shard.is_empty() {
            let _ = writeln!(out, "shard:{:?}", self.shard);
        }
        let _ = writeln!(out, "type:{}", self.tablet_type);
    }
}

impl TextFormat for ShardReplication {
    fn write_text(&self, out: &mut String) {
        for alias in &self.nodes {
            let _ = writeln!(out, "nodes:{{tablet_alias:{}}}", alias_text(alias));
        }
    }
}

impl TextFormat for CellInfo {
    fn write_text(&self, out: &mut String) {
        if !self.server_address.is_empty() {
            let _ = writeln!(out, "server_address:{:?}", self.server_address);
        }
        if !self.root.is_empty() {
            let _ = writeln!(out, "root:{:?}", self.root);
        }
    }
}
