use shardgrid_core::TabletAlias;
use shardgrid_topo::Tablet;
use shardgrid_wrangler::{InitTabletOptions, WranglerError};

use crate::context::Context;

pub async fn init_tablet(ctx: &Context, tablet: Tablet, options: InitTabletOptions) -> anyhow::Result<()> {
    ctx.run(async { ctx.wr.init_tablet(&tablet, options) })
        .await?;
    Ok(())
}

pub async fn get_tablet(ctx: &Context, alias: &TabletAlias) -> anyhow::Result<()> {
    let info = ctx
        .run(async { ctx.wr.ts().get_tablet(alias).map_err(WranglerError::from) })
        .await?;
    println!("{}", serde_json::to_string_pretty(&info.tablet)?);
    Ok(())
}

pub async fn delete_tablet(ctx: &Context, aliases: &[TabletAlias], allow_primary: bool) -> anyhow::Result<()> {
    for alias in aliases {
        ctx.run(async { ctx.wr.delete_tablet(alias, allow_primary) })
            .await?;
    }
    Ok(())
}

pub async fn get_permissions(ctx: &Context, alias: &TabletAlias) -> anyhow::Result<()> {
    let snapshot = ctx.run(ctx.wr.get_permissions(alias)).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
