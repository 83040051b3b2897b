use shardgrid_core::parse_keyspace_shard;

use crate::context::Context;

pub async fn validate_shard(ctx: &Context, keyspace_shard: &str) -> anyhow::Result<()> {
    let (keyspace, shard) = parse_keyspace_shard(keyspace_shard)?;
    ctx.run(ctx.wr.validate_permissions_shard(&keyspace, &shard))
        .await
}

pub async fn validate_keyspace(ctx: &Context, keyspace: &str) -> anyhow::Result<()> {
    ctx.run(ctx.wr.validate_permissions_keyspace(keyspace))
        .await
}
