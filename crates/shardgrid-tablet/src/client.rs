//! Tablet manager client.
//!
//! Resolves a tablet's recorded network address to its action loop and
//! issues commands with a per-call timeout. The address table is injected
//! state: tablets become reachable when their loop is registered here.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use shardgrid_topo::Tablet;

use crate::action_loop::TabletHandle;
use crate::error::{TabletError, TabletResult};
use crate::permissions::PermissionSnapshot;

/// Default bound on a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for tablet action loops. Cheap to clone; clones share the
/// address table.
#[derive(Clone)]
pub struct TabletManagerClient {
    tablets: Arc<RwLock<HashMap<String, TabletHandle>>>,
    timeout: Duration,
}

impl Default for TabletManagerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TabletManagerClient {
    pub fn new() -> Self {
        Self {
            tablets: Arc::new(RwLock::new(HashMap::new())),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Set the bound applied to each remote call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Make the action loop behind `handle` reachable at `addr`.
    pub async fn register(&self, addr: &str, handle: TabletHandle) {
        let mut tablets = self.tablets.write().await;
        if let Some(old) = tablets.insert(addr.to_string(), handle) {
            debug!(%addr, alias = %old.alias(), "replacing tablet registration");
        }
    }

    pub async fn unregister(&self, addr: &str) {
        self.tablets.write().await.remove(addr);
    }

    pub async fn get_permissions(&self, tablet: &Tablet) -> TabletResult<PermissionSnapshot> {
        let handle = self.resolve(tablet).await?;
        self.call(tablet, handle.get_permissions()).await
    }

    pub async fn ping(&self, tablet: &Tablet) -> TabletResult<()> {
        let handle = self.resolve(tablet).await?;
        self.call(tablet, handle.ping()).await
    }

    /// Ask a tablet's action loop to exit.
    pub async fn stop(&self, tablet: &Tablet) -> TabletResult<()> {
        let handle = self.resolve(tablet).await?;
        self.call(tablet, handle.stop()).await?;
        self.unregister(&tablet.addr()).await;
        Ok(())
    }

    async fn resolve(&self, tablet: &Tablet) -> TabletResult<TabletHandle> {
        let addr = tablet.addr();
        let tablets = self.tablets.read().await;
        match tablets.get(&addr) {
            Some(handle) if handle.alias() == &tablet.alias => Ok(handle.clone()),
            Some(handle) => {
                warn!(%addr, expected = %tablet.alias, found = %handle.alias(), "address serves another tablet");
                Err(TabletError::Unavailable(addr))
            }
            None => Err(TabletError::Unavailable(addr)),
        }
    }

    async fn call<T>(
        &self,
        tablet: &Tablet,
        fut: impl Future<Output = TabletResult<T>>,
    ) -> TabletResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| TabletError::Timeout {
                addr: tablet.addr(),
                timeout: self.timeout,
            })?
    }
}
