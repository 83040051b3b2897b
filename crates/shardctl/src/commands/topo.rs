use std::io::Write;

use shardgrid_wrangler::topo_io::{self, CatOptions, CopyOptions};

use crate::context::Context;

pub async fn cat(ctx: &Context, patterns: &[String], long: bool, decode: bool) -> anyhow::Result<()> {
    let options = CatOptions { long, decode };
    let mut stdout = std::io::stdout().lock();
    for pattern in patterns {
        let entries = ctx
            .run(async { topo_io::cat(ctx.wr.ts(), pattern, options) })
            .await?;
        for entry in entries {
            stdout.write_all(&entry?)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

pub async fn cp(ctx: &Context, src: &str, dst: &str, to_topo: bool) -> anyhow::Result<()> {
    ctx.run(async { topo_io::copy(ctx.wr.ts(), src, dst, CopyOptions { to_topo }) })
        .await
}
