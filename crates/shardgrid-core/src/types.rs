//! Identifiers shared across shardgrid crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing operator-supplied identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid tablet alias {0:?}: expected <cell>-<uid>")]
    TabletAlias(String),

    #[error("invalid keyspace/shard {0:?}: expected <keyspace>/<shard>")]
    KeyspaceShard(String),
}

/// Globally unique name of a tablet: the cell it lives in plus a numeric id.
///
/// Rendered as `<cell>-<uid>` with the uid zero-padded to ten digits, which
/// keeps lexicographic and numeric ordering in agreement for topology paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabletAlias {
    pub cell: String,
    pub uid: u32,
}

impl TabletAlias {
    pub fn new(cell: impl Into<String>, uid: u32) -> Self {
        Self {
            cell: cell.into(),
            uid,
        }
    }
}

impl fmt::Display for TabletAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:010}", self.cell, self.uid)
    }
}

impl FromStr for TabletAlias {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cell, uid) = s
            .rsplit_once('-')
            .ok_or_else(|| ParseError::TabletAlias(s.to_string()))?;
        if cell.is_empty() {
            return Err(ParseError::TabletAlias(s.to_string()));
        }
        let uid = uid
            .parse::<u32>()
            .map_err(|_| ParseError::TabletAlias(s.to_string()))?;
        Ok(Self::new(cell, uid))
    }
}

/// Split a `<keyspace>/<shard>` argument.
pub fn parse_keyspace_shard(s: &str) -> Result<(String, String), ParseError> {
    match s.split_once('/') {
        Some((keyspace, shard))
            if !keyspace.is_empty() && !shard.is_empty() && !shard.contains('/') =>
        {
            Ok((keyspace.to_string(), shard.to_string()))
        }
        _ => Err(ParseError::KeyspaceShard(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_display_pads_uid() {
        let alias = TabletAlias::new("cell1", 100);
        assert_eq!(alias.to_string(), "cell1-0000000100");
    }

    #[test]
    fn alias_parse() {
        let alias: TabletAlias = "cell1-0000000100".parse().unwrap();
        assert_eq!(alias, TabletAlias::new("cell1", 100));

        // Cells may themselves contain dashes.
        let alias: TabletAlias = "us-east-1-7".parse().unwrap();
        assert_eq!(alias, TabletAlias::new("us-east-1", 7));
    }

    #[test]
    fn alias_parse_rejects_garbage() {
        assert!("cell1".parse::<TabletAlias>().is_err());
        assert!("-12".parse::<TabletAlias>().is_err());
        assert!("cell1-abc".parse::<TabletAlias>().is_err());
    }

    #[test]
    fn alias_ordering_is_cell_then_uid() {
        let mut aliases = vec![
            TabletAlias::new("cell2", 0),
            TabletAlias::new("cell1", 2),
            TabletAlias::new("cell1", 1),
        ];
        aliases.sort();
        assert_eq!(aliases[0], TabletAlias::new("cell1", 1));
        assert_eq!(aliases[2], TabletAlias::new("cell2", 0));
    }

    #[test]
    fn keyspace_shard_parse() {
        assert_eq!(
            parse_keyspace_shard("ks/-80").unwrap(),
            ("ks".to_string(), "-80".to_string())
        );
        assert!(parse_keyspace_shard("ks").is_err());
        assert!(parse_keyspace_shard("/0").is_err());
        assert!(parse_keyspace_shard("ks/a/b").is_err());
    }
}
