pub mod permissions;
pub mod shard;
pub mod tablet;
pub mod topo;
