//! Raw topology access: dumping nodes and copying them to and from files.

use std::fs;
use std::path::Path;

use tracing::info;

use shardgrid_topo::codec;
use shardgrid_topo::{NodeEntry, TopoServer};

use crate::error::{WranglerError, WranglerResult};

/// Output options for [`cat`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CatOptions {
    /// Prefix each entry with a `path=<path> version=<version>` line.
    pub long: bool,
    /// Render payloads as text instead of emitting the raw bytes.
    pub decode: bool,
}

/// Direction for [`copy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    /// Copy from a file into the topology instead of the other way round.
    pub to_topo: bool,
}

/// Dump every node matching `pattern`, in path order.
///
/// The glob is resolved up front; entries are formatted as the iterator
/// is consumed.
pub fn cat(
    ts: &TopoServer,
    pattern: &str,
    options: CatOptions,
) -> WranglerResult<impl Iterator<Item = WranglerResult<Vec<u8>>> + use<>> {
    let entries = ts.conn().get_glob(pattern)?;
    Ok(entries
        .into_iter()
        .map(move |entry| format_entry(&entry, options)))
}

fn format_entry(entry: &NodeEntry, options: CatOptions) -> WranglerResult<Vec<u8>> {
    let mut out = Vec::new();
    if options.long {
        out.extend_from_slice(format!("path={} version={}\n", entry.path, entry.version).as_bytes());
    }
    if options.decode {
        out.extend_from_slice(codec::decode_text(&entry.path, &entry.data)?.as_bytes());
    } else {
        out.extend_from_slice(&entry.data);
    }
    Ok(out)
}

/// Copy one node to a file, or with `to_topo` one file to a node.
///
/// Payloads are copied verbatim. Writing into the topology is
/// unconditional: the node is created or overwritten.
pub fn copy(ts: &TopoServer, src: &str, dst: &str, options: CopyOptions) -> WranglerResult<()> {
    if options.to_topo {
        let data = fs::read(src).map_err(|source| WranglerError::Io {
            path: src.to_string(),
            source,
        })?;
        let version = ts.conn().compare_and_swap(dst, None, &data)?;
        info!(%src, %dst, version, bytes = data.len(), "file copied into topology");
    } else {
        let (data, version) = ts.conn().get(src)?;
        write_file(Path::new(dst), &data)?;
        info!(%src, %dst, version, bytes = data.len(), "node copied to file");
    }
    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> WranglerResult<()> {
    let io_err = |source| WranglerError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, data).map_err(io_err)
}
