//! Access to a tablet's local database server.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{TabletError, TabletResult};
use crate::permissions::{DB_QUERY, PermissionSnapshot, TableSnapshot, USER_QUERY};

/// Privileged query access to the database server a tablet manages.
pub trait MysqlDaemon: Send + Sync {
    /// Run a query as the superuser and return its full result.
    fn fetch_super_query(&self, query: &str) -> TabletResult<TableSnapshot>;

    /// Read both grant tables.
    fn get_permissions(&self) -> TabletResult<PermissionSnapshot> {
        Ok(PermissionSnapshot {
            user: self.fetch_super_query(USER_QUERY)?,
            db: self.fetch_super_query(DB_QUERY)?,
        })
    }
}

/// A daemon answering from canned query results.
///
/// Results can be replaced while a tablet is running, which is how tests
/// introduce drift between replicas.
#[derive(Default)]
pub struct MemoryDaemon {
    results: RwLock<HashMap<String, TableSnapshot>>,
}

impl MemoryDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a daemon whose grant tables hold `permissions`.
    pub fn with_permissions(permissions: PermissionSnapshot) -> Self {
        let daemon = Self::new();
        daemon.set_permissions(permissions);
        daemon
    }

    pub fn set_query_result(&self, query: &str, result: TableSnapshot) {
        let mut results = match self.results.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        results.insert(query.to_string(), result);
    }

    pub fn set_permissions(&self, permissions: PermissionSnapshot) {
        self.set_query_result(USER_QUERY, permissions.user);
        self.set_query_result(DB_QUERY, permissions.db);
    }
}

impl MysqlDaemon for MemoryDaemon {
    fn fetch_super_query(&self, query: &str) -> TabletResult<TableSnapshot> {
        let results = self
            .results
            .read()
            .map_err(|_| TabletError::Query("query results lock poisoned".to_string()))?;
        debug!(%query, "fetch_super_query");
        results
            .get(query)
            .cloned()
            .ok_or_else(|| TabletError::Query(format!("unexpected query: {query}")))
    }
}
