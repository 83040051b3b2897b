//! TopoCat and TopoCp behavior.

use regex::Regex;
use shardgrid_topo::{Keyspace, KeyspaceType, TopoServer, codec};
use shardgrid_wrangler::topo_io::{CatOptions, CopyOptions, cat, copy};

fn topo_with_keyspaces() -> TopoServer {
    let ts = TopoServer::open_in_memory(&["cell1"]).unwrap();
    // Created out of order; output must still be sorted by path.
    ts.create_keyspace(
        "ks2",
        &Keyspace {
            keyspace_type: KeyspaceType::Snapshot,
        },
    )
    .unwrap();
    ts.create_keyspace("ks1", &Keyspace::default()).unwrap();
    ts
}

fn cat_string(ts: &TopoServer, pattern: &str, options: CatOptions) -> String {
    let mut out = Vec::new();
    for entry in cat(ts, pattern, options).unwrap() {
        out.extend(entry.unwrap());
    }
    String::from_utf8(out).unwrap()
}

/// Versions are opaque; replace them before comparing.
fn strip_versions(s: &str) -> String {
    Regex::new(r"version=\d+")
        .unwrap()
        .replace_all(s, "version=V")
        .into_owned()
}

#[test]
fn cat_long_decoded() {
    let ts = topo_with_keyspaces();
    let options = CatOptions {
        long: true,
        decode: true,
    };
    let out = cat_string(&ts, "/keyspaces/*/Keyspace", options);
    assert_eq!(
        strip_versions(&out),
        "path=/keyspaces/ks1/Keyspace version=V\n\
         path=/keyspaces/ks2/Keyspace version=V\n\
         keyspace_type:SNAPSHOT\n"
    );
}

#[test]
fn cat_long_versions_are_present_and_ordered_by_write() {
    let ts = topo_with_keyspaces();
    let options = CatOptions {
        long: true,
        decode: false,
    };
    let out = cat_string(&ts, "/keyspaces/*/Keyspace", options);

    let re = Regex::new(r"path=(\S+) version=(\d+)").unwrap();
    let found: Vec<(String, u64)> = re
        .captures_iter(&out)
        .map(|c| (c[1].to_string(), c[2].parse().unwrap()))
        .collect();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].0, "/keyspaces/ks1/Keyspace");
    assert_eq!(found[1].0, "/keyspaces/ks2/Keyspace");
    // ks2 was written first.
    assert!(found[1].1 < found[0].1);
}

#[test]
fn cat_multiple_patterns_concatenate() {
    let ts = topo_with_keyspaces();
    let options = CatOptions {
        long: true,
        decode: true,
    };
    let mut out = String::new();
    for pattern in ["/keyspaces/ks2/Keyspace", "/cells/*/CellInfo"] {
        out.push_str(&cat_string(&ts, pattern, options));
    }
    assert_eq!(
        strip_versions(&out),
        "path=/keyspaces/ks2/Keyspace version=V\n\
         keyspace_type:SNAPSHOT\n\
         path=/cells/cell1/CellInfo version=V\n"
    );
}

#[test]
fn copy_round_trip_preserves_record() {
    let ts = topo_with_keyspaces();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("dump").join("ks2.Keyspace");
    let file = file.to_str().unwrap();

    copy(&ts, "/keyspaces/ks2/Keyspace", file, CopyOptions { to_topo: false }).unwrap();
    copy(&ts, file, "/keyspaces/ks3/Keyspace", CopyOptions { to_topo: true }).unwrap();

    let original = ts.get_keyspace("ks2").unwrap();
    let copied = ts.get_keyspace("ks3").unwrap();
    assert_eq!(copied.keyspace, original.keyspace);
    assert!(copied.version > original.version);

    let (raw_original, _) = ts.conn().get("/keyspaces/ks2/Keyspace").unwrap();
    let (raw_copied, _) = ts.conn().get("/keyspaces/ks3/Keyspace").unwrap();
    assert_eq!(raw_copied, raw_original);
}

#[test]
fn copy_to_topo_overwrites_existing_node() {
    let ts = topo_with_keyspaces();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("snapshot.Keyspace");
    std::fs::write(
        &file,
        codec::encode(&Keyspace {
            keyspace_type: KeyspaceType::Snapshot,
        })
        .unwrap(),
    )
    .unwrap();

    copy(
        &ts,
        file.to_str().unwrap(),
        "/keyspaces/ks1/Keyspace",
        CopyOptions { to_topo: true },
    )
    .unwrap();
    assert_eq!(
        ts.get_keyspace("ks1").unwrap().keyspace.keyspace_type,
        KeyspaceType::Snapshot
    );
}

#[test]
fn copied_file_holds_json_payload() {
    let ts = topo_with_keyspaces();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("ks2.json");
    copy(
        &ts,
        "/keyspaces/ks2/Keyspace",
        file.to_str().unwrap(),
        CopyOptions::default(),
    )
    .unwrap();

    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();
    assert_eq!(value["keyspace_type"], "SNAPSHOT");
}
