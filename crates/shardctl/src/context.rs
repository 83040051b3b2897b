//! Everything a command needs: the wrangler and the action timeout.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, bail};
use tracing::{debug, info};

use shardgrid_core::ShardgridConfig;
use shardgrid_core::config::parse_duration;
use shardgrid_tablet::TabletManagerClient;
use shardgrid_topo::TopoServer;
use shardgrid_wrangler::{Wrangler, WranglerResult, with_deadline};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "shardgrid.toml";

pub struct Context {
    pub wr: Wrangler,
    pub action_timeout: Duration,
}

impl Context {
    /// Load configuration, apply command-line overrides and open the
    /// topology.
    pub fn load(
        config_path: Option<&Path>,
        topo_path: Option<PathBuf>,
        action_timeout: Option<&str>,
    ) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;

        let Some(topo_path) = topo_path.or_else(|| config.topo.path.clone()) else {
            bail!("no topology path configured; set [topo].path or pass --topo_path");
        };
        let action_timeout = match action_timeout {
            Some(s) => parse_duration(s).with_context(|| format!("invalid --action_timeout {s:?}"))?,
            None => config.wrangler.action_timeout(),
        };

        if let Some(parent) = topo_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let ts = TopoServer::open(&topo_path, &config.topo.cells)
            .with_context(|| format!("opening topology at {}", topo_path.display()))?;
        info!(path = %topo_path.display(), cells = ?config.topo.cells, "topology opened");

        let tmc = TabletManagerClient::new().with_timeout(config.wrangler.remote_timeout());
        let wr = Wrangler::from_config(ts, tmc, &config.wrangler);
        Ok(Self { wr, action_timeout })
    }

    /// Run an operation under the action timeout.
    pub async fn run<T, F>(&self, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = WranglerResult<T>>,
    {
        Ok(with_deadline(self.action_timeout, fut).await?)
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ShardgridConfig> {
    match path {
        Some(path) => ShardgridConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            debug!(path = DEFAULT_CONFIG_FILE, "using config from working directory");
            ShardgridConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))
        }
        None => Ok(ShardgridConfig::default()),
    }
}
