pub mod config;
pub mod types;

pub use config::ShardgridConfig;
pub use types::*;
