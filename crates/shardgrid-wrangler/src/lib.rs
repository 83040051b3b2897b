//! shardgrid-wrangler — multi-step control-plane operations.
//!
//! The [`Wrangler`] combines a [`TopoServer`](shardgrid_topo::TopoServer)
//! with a [`TabletManagerClient`](shardgrid_tablet::TabletManagerClient)
//! and runs the operations that span both:
//!
//! - `shard`: guarded shard deletion
//! - `tablet`: tablet initialization and removal
//! - `permissions`: cross-replica grant validation
//! - `topo_io`: raw node dump (`cat`) and copy to/from files
//!
//! Operations that reach tablets are async; topology-only ones are not.
//! Guard failures happen before any mutation. Later failures leave
//! committed steps in place, and every step can be safely re-run.

pub mod error;
pub mod permissions;
pub mod shard;
pub mod tablet;
pub mod topo_io;
pub mod wrangler;

pub use error::{WranglerError, WranglerResult};
pub use permissions::{ValidationFinding, ValidationReport};
pub use shard::DeleteShardOptions;
pub use tablet::InitTabletOptions;
pub use topo_io::{CatOptions, CopyOptions};
pub use wrangler::{Wrangler, with_deadline};
