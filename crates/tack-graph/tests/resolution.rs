// resolution.rs — Specs on disk through to an injected target graph.
//
// Lays out a small BUILD.toml tree, resolves several command-line specs
// through the BuildFileMapper and injects every address, checking that the
// requested-target list keeps specification order while the graph itself
// holds each target exactly once.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tack_graph::{Address, AddressMapper, BuildFileMapper, CmdLineSpecParser, TargetGraph, BUILD_FILE_NAME};
use tempfile::TempDir;

fn write_build(root: &Path, dir: &str, content: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join(BUILD_FILE_NAME), content).unwrap();
}

fn workspace() -> TempDir {
    let root = TempDir::new().unwrap();
    write_build(
        root.path(),
        "src/app",
        r#"
[[target]]
name = "app"
kind = "binary"
dependencies = ["src/lib"]
"#,
    );
    write_build(
        root.path(),
        "src/lib",
        r#"
[[target]]
name = "lib"
dependencies = ["3rdparty:serde"]
"#,
    );
    write_build(root.path(), "3rdparty", "[[target]]\nname = \"serde\"\n");
    root
}

#[test]
fn overlapping_specs_keep_specification_order() {
    let root = workspace();
    let mapper: Arc<dyn AddressMapper> = Arc::new(BuildFileMapper::new(root.path()));
    let mut parser = CmdLineSpecParser::new(root.path(), Arc::clone(&mapper), &[], &[]).unwrap();
    let mut graph = TargetGraph::new(mapper);

    // S1 and S3 name the same target.
    let mut targets = Vec::new();
    for spec in ["src/app", "3rdparty:serde", "src/app:app"] {
        for address in parser.parse_addresses(spec, true).unwrap() {
            targets.push(graph.inject_address_closure(&address).unwrap());
        }
    }

    let order: Vec<String> = targets.iter().map(|t| t.address.to_string()).collect();
    assert_eq!(order, vec!["src/app:app", "3rdparty:serde", "src/app:app"]);
    assert!(Arc::ptr_eq(&targets[0], &targets[2]));
    assert_eq!(graph.len(), 3);
}

#[test]
fn collect_mode_lets_valid_specs_through() {
    let root = workspace();
    let mapper: Arc<dyn AddressMapper> = Arc::new(BuildFileMapper::new(root.path()));
    let mut parser = CmdLineSpecParser::new(root.path(), mapper, &[], &[]).unwrap();

    let mut resolved = Vec::new();
    for spec in ["src/missing:x", "src/lib"] {
        resolved.extend(parser.parse_addresses(spec, false).unwrap());
    }
    assert_eq!(resolved, vec![Address::new("src/lib", "lib")]);
    assert_eq!(parser.errors().len(), 1);
}

#[test]
fn fail_fast_aborts_on_first_bad_spec() {
    let root = workspace();
    let mapper: Arc<dyn AddressMapper> = Arc::new(BuildFileMapper::new(root.path()));
    let mut parser = CmdLineSpecParser::new(root.path(), mapper, &[], &[]).unwrap();

    let mut resolved = Vec::new();
    let mut failed = false;
    for spec in ["src/missing:x", "src/lib"] {
        match parser.parse_addresses(spec, true) {
            Ok(found) => resolved.extend(found),
            Err(_) => {
                failed = true;
                break;
            }
        }
    }
    assert!(failed);
    assert!(resolved.is_empty());
}
