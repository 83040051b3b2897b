//! Keyspace records.

use tracing::info;

use crate::conn::Version;
use crate::error::{TopoError, TopoResult};
use crate::paths;
use crate::server::TopoServer;
use crate::types::Keyspace;

/// A keyspace record together with its name and node version.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyspaceInfo {
    pub name: String,
    pub keyspace: Keyspace,
    pub version: Version,
}

impl TopoServer {
    pub fn create_keyspace(&self, name: &str, keyspace: &Keyspace) -> TopoResult<()> {
        paths::validate_name("keyspace", name).map_err(TopoError::InvalidArgument)?;
        self.create_record(&paths::keyspace_path(name), keyspace)?;
        info!(keyspace = %name, keyspace_type = %keyspace.keyspace_type, "keyspace created");
        Ok(())
    }

    pub fn get_keyspace(&self, name: &str) -> TopoResult<KeyspaceInfo> {
        let (keyspace, version) = self.get_record(&paths::keyspace_path(name))?;
        Ok(KeyspaceInfo {
            name: name.to_string(),
            keyspace,
            version,
        })
    }

    /// Names of all keyspaces, sorted.
    pub fn get_keyspace_names(&self) -> TopoResult<Vec<String>> {
        self.child_names(&paths::keyspaces_glob())
    }
}
