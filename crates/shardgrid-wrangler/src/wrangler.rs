//! The Wrangler façade.

use std::future::Future;
use std::time::Duration;

use shardgrid_core::config::WranglerConfig;
use shardgrid_tablet::TabletManagerClient;
use shardgrid_topo::TopoServer;

use crate::error::{WranglerError, WranglerResult};

/// Runs control-plane operations against a topology and its tablets.
///
/// Cheap to clone; clones share the topology and the client.
#[derive(Clone)]
pub struct Wrangler {
    ts: TopoServer,
    tmc: TabletManagerClient,
    /// Pause between attempts to reach an unresponsive tablet.
    tablet_retry_delay: Duration,
    /// Attempts made before a tablet is reported unreachable.
    tablet_retry_attempts: u32,
}

impl Wrangler {
    pub fn new(ts: TopoServer, tmc: TabletManagerClient) -> Self {
        Self {
            ts,
            tmc,
            tablet_retry_delay: Duration::from_millis(100),
            tablet_retry_attempts: 3,
        }
    }

    /// Build a wrangler with retry settings taken from configuration.
    pub fn from_config(ts: TopoServer, tmc: TabletManagerClient, config: &WranglerConfig) -> Self {
        Self::new(ts, tmc)
            .with_tablet_retry_delay(config.tablet_retry_delay())
            .with_tablet_retry_attempts(config.tablet_retry_attempts)
    }

    /// Set the delay between tablet fetch attempts.
    pub fn with_tablet_retry_delay(mut self, delay: Duration) -> Self {
        self.tablet_retry_delay = delay;
        self
    }

    /// Set the number of tablet fetch attempts. Zero is treated as one.
    pub fn with_tablet_retry_attempts(mut self, attempts: u32) -> Self {
        self.tablet_retry_attempts = attempts.max(1);
        self
    }

    pub fn ts(&self) -> &TopoServer {
        &self.ts
    }

    pub fn tmc(&self) -> &TabletManagerClient {
        &self.tmc
    }

    pub fn tablet_retry_delay(&self) -> Duration {
        self.tablet_retry_delay
    }

    pub fn tablet_retry_attempts(&self) -> u32 {
        self.tablet_retry_attempts
    }
}

/// Run `fut` under a deadline.
///
/// On expiry the future is dropped, cancelling whatever step it was in;
/// steps that already committed stay committed.
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> WranglerResult<T>
where
    F: Future<Output = WranglerResult<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| WranglerError::DeadlineExceeded(timeout))?
}
