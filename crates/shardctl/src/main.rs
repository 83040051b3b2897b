//! shardctl — operator commands against a shardgrid topology.
//!
//! # Usage
//!
//! ```text
//! shardctl --topo_path /var/lib/shardgrid/topo.redb CreateKeyspace ks
//! shardctl DeleteShard --even_if_serving --recursive ks/-80
//! shardctl TopoCat --long --decode_proto '/keyspaces/*/Keyspace'
//! ```
//!
//! Every command runs under the action timeout and exits non-zero with a
//! single error message on failure.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use shardgrid_core::TabletAlias;
use shardgrid_topo::TabletType;

mod commands;
mod context;

use context::Context;

#[derive(Parser)]
#[command(
    name = "shardctl",
    about = "shardgrid — shard and tablet control plane",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to shardgrid.toml (default: ./shardgrid.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Topology database file, overriding [topo].path.
    #[arg(long = "topo_path", global = true)]
    topo_path: Option<PathBuf>,

    /// Bound on the whole command (e.g. "30s"), overriding
    /// [wrangler].action_timeout.
    #[arg(long = "action_timeout", global = true)]
    action_timeout: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a keyspace.
    #[command(name = "CreateKeyspace")]
    CreateKeyspace {
        /// NORMAL or SNAPSHOT.
        #[arg(long = "keyspace_type", default_value = "NORMAL")]
        keyspace_type: String,
        keyspace: String,
    },
    /// Create a shard in an existing keyspace.
    #[command(name = "CreateShard")]
    CreateShard {
        /// <keyspace>/<shard>
        keyspace_shard: String,
    },
    /// Print a shard record.
    #[command(name = "GetShard")]
    GetShard { keyspace_shard: String },
    /// Delete shards, refusing serving or occupied ones unless told otherwise.
    #[command(name = "DeleteShard")]
    DeleteShard {
        /// Delete the shard even if it is serving.
        #[arg(long = "even_if_serving")]
        even_if_serving: bool,
        /// Stop and deregister the shard's tablets as well.
        #[arg(long)]
        recursive: bool,
        #[arg(required = true)]
        keyspace_shards: Vec<String>,
    },
    /// Register a tablet in the topology.
    #[command(name = "InitTablet")]
    InitTablet {
        /// Tablet alias, <cell>-<uid>.
        alias: TabletAlias,
        /// PRIMARY, REPLICA, RDONLY, SPARE or DRAINED.
        tablet_type: TabletType,
        #[arg(long, default_value = "localhost")]
        hostname: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        keyspace: String,
        #[arg(long)]
        shard: String,
        /// Overwrite an existing record for this alias.
        #[arg(long = "allow_update")]
        allow_update: bool,
        /// Let a new primary replace the shard's current one.
        #[arg(long = "allow_primary_override")]
        allow_primary_override: bool,
        /// Create the keyspace and shard if missing.
        #[arg(long = "create_shard_and_keyspace")]
        create_shard_and_keyspace: bool,
    },
    /// Print a tablet record.
    #[command(name = "GetTablet")]
    GetTablet { alias: TabletAlias },
    /// Deregister tablets.
    #[command(name = "DeleteTablet")]
    DeleteTablet {
        /// Allow deleting the shard primary.
        #[arg(long = "allow_primary")]
        allow_primary: bool,
        #[arg(required = true)]
        aliases: Vec<TabletAlias>,
    },
    /// Print a tablet's grant tables.
    #[command(name = "GetPermissions")]
    GetPermissions { alias: TabletAlias },
    /// Compare grants of every tablet in a shard with its primary.
    #[command(name = "ValidatePermissionsShard")]
    ValidatePermissionsShard { keyspace_shard: String },
    /// Compare grants of every tablet in a keyspace with their primaries.
    #[command(name = "ValidatePermissionsKeyspace")]
    ValidatePermissionsKeyspace { keyspace: String },
    /// Dump topology nodes matching glob patterns.
    #[command(name = "TopoCat")]
    TopoCat {
        /// Prefix each node with its path and version.
        #[arg(long)]
        long: bool,
        /// Render payloads as text.
        #[arg(long = "decode_proto")]
        decode_proto: bool,
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Copy a node to a file, or with --to_topo a file to a node.
    #[command(name = "TopoCp")]
    TopoCp {
        #[arg(long = "to_topo")]
        to_topo: bool,
        src: String,
        dst: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,shardctl=debug,shardgrid=debug")
            }),
        )
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(
        cli.config.as_deref(),
        cli.topo_path,
        cli.action_timeout.as_deref(),
    )?;
    run(&ctx, cli.command).await
}

async fn run(ctx: &Context, command: Command) -> anyhow::Result<()> {
    match command {
        Command::CreateKeyspace {
            keyspace_type,
            keyspace,
        } => commands::shard::create_keyspace(ctx, &keyspace, &keyspace_type).await,
        Command::CreateShard { keyspace_shard } => {
            commands::shard::create_shard(ctx, &keyspace_shard).await
        }
        Command::GetShard { keyspace_shard } => commands::shard::get_shard(ctx, &keyspace_shard).await,
        Command::DeleteShard {
            even_if_serving,
            recursive,
            keyspace_shards,
        } => commands::shard::delete_shard(ctx, &keyspace_shards, even_if_serving, recursive).await,
        Command::InitTablet {
            alias,
            tablet_type,
            hostname,
            port,
            keyspace,
            shard,
            allow_update,
            allow_primary_override,
            create_shard_and_keyspace,
        } => {
            let tablet = shardgrid_topo::Tablet {
                alias,
                hostname,
                port,
                keyspace,
                shard,
                tablet_type,
            };
            let options = shardgrid_wrangler::InitTabletOptions {
                allow_update,
                create_shard_and_keyspace,
                allow_primary_override,
            };
            commands::tablet::init_tablet(ctx, tablet, options).await
        }
        Command::GetTablet { alias } => commands::tablet::get_tablet(ctx, &alias).await,
        Command::DeleteTablet {
            allow_primary,
            aliases,
        } => commands::tablet::delete_tablet(ctx, &aliases, allow_primary).await,
        Command::GetPermissions { alias } => commands::tablet::get_permissions(ctx, &alias).await,
        Command::ValidatePermissionsShard { keyspace_shard } => {
            commands::permissions::validate_shard(ctx, &keyspace_shard).await
        }
        Command::ValidatePermissionsKeyspace { keyspace } => {
            commands::permissions::validate_keyspace(ctx, &keyspace).await
        }
        Command::TopoCat {
            long,
            decode_proto,
            patterns,
        } => commands::topo::cat(ctx, &patterns, long, decode_proto).await,
        Command::TopoCp { to_topo, src, dst } => {
            commands::topo::cp(ctx, &src, &dst, to_topo).await
        }
    }
}
