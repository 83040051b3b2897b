use anyhow::bail;

use shardgrid_core::parse_keyspace_shard;
use shardgrid_topo::{Keyspace, KeyspaceType};
use shardgrid_wrangler::{DeleteShardOptions, WranglerError};

use crate::context::Context;

fn parse_keyspace_type(s: &str) -> anyhow::Result<KeyspaceType> {
    match s.to_ascii_uppercase().as_str() {
        "NORMAL" => Ok(KeyspaceType::Normal),
        "SNAPSHOT" => Ok(KeyspaceType::Snapshot),
        other => bail!("unknown keyspace type {other:?}, expected NORMAL or SNAPSHOT"),
    }
}

pub async fn create_keyspace(ctx: &Context, keyspace: &str, keyspace_type: &str) -> anyhow::Result<()> {
    let record = Keyspace {
        keyspace_type: parse_keyspace_type(keyspace_type)?,
    };
    ctx.run(async { ctx.wr.ts().create_keyspace(keyspace, &record).map_err(WranglerError::from) })
        .await
}

pub async fn create_shard(ctx: &Context, keyspace_shard: &str) -> anyhow::Result<()> {
    let (keyspace, shard) = parse_keyspace_shard(keyspace_shard)?;
    ctx.run(async { ctx.wr.ts().create_shard(&keyspace, &shard).map_err(WranglerError::from) })
        .await?;
    Ok(())
}

pub async fn get_shard(ctx: &Context, keyspace_shard: &str) -> anyhow::Result<()> {
    let (keyspace, shard) = parse_keyspace_shard(keyspace_shard)?;
    let si = ctx
        .run(async { ctx.wr.ts().get_shard(&keyspace, &shard).map_err(WranglerError::from) })
        .await?;
    println!("{}", serde_json::to_string_pretty(&si.shard)?);
    Ok(())
}

pub async fn delete_shard(
    ctx: &Context,
    keyspace_shards: &[String],
    even_if_serving: bool,
    recursive: bool,
) -> anyhow::Result<()> {
    let options = DeleteShardOptions {
        even_if_serving,
        recursive,
    };
    for keyspace_shard in keyspace_shards {
        let (keyspace, shard) = parse_keyspace_shard(keyspace_shard)?;
        ctx.run(ctx.wr.delete_shard(&keyspace, &shard, options))
            .await?;
    }
    Ok(())
}
