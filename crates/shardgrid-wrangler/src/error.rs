//! Wrangler error types.
//!
//! Messages of the guard variants are matched by operator scripts and
//! must stay stable.

use std::time::Duration;

use thiserror::Error;

use shardgrid_tablet::TabletError;
use shardgrid_topo::{TabletAlias, TopoError};

use crate::permissions::ValidationReport;

pub type WranglerResult<T> = Result<T, WranglerError>;

#[derive(Debug, Error)]
pub enum WranglerError {
    #[error(
        "shard {keyspace}/{shard} is still serving, cannot delete it, use even_if_serving flag if needed"
    )]
    StillServing { keyspace: String, shard: String },

    #[error(
        "shard {keyspace}/{shard} still has {tablets} tablets; use -recursive or remove them manually"
    )]
    ShardOccupied {
        keyspace: String,
        shard: String,
        tablets: usize,
    },

    #[error("tablet {0} is a primary, use allow_primary flag to delete it")]
    PrimaryTablet(TabletAlias),

    #[error(
        "shard {keyspace}/{shard} already has primary {primary}, use allow_primary_override flag to replace it"
    )]
    PrimaryExists {
        keyspace: String,
        shard: String,
        primary: TabletAlias,
    },

    #[error("tablet {alias} already exists in {existing}, cannot move it to {requested}")]
    TabletMoved {
        alias: TabletAlias,
        existing: String,
        requested: String,
    },

    #[error("validation failed with {n} finding(s):\n{0}", n = .0.len())]
    ValidationFailed(ValidationReport),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("topology error: {0}")]
    Topo(#[from] TopoError),

    #[error("tablet error: {0}")]
    Tablet(#[from] TabletError),
}
