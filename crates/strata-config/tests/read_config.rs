//! Integration tests for the full read pipeline: assembly of include
//! layers, reference resolution, and relocation, driven through real
//! files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use strata_config::{ConfigError, ConfigNode, ConfigReader, IncludeReader};
use tempfile::TempDir;

/// Write a JSON document into the test directory.
fn write_config(dir: &Path, name: &str, contents: &Value) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, serde_json::to_string_pretty(contents).unwrap()).unwrap();
    path
}

fn read(dir: &TempDir, name: &str) -> Result<ConfigNode, ConfigError> {
    ConfigReader::new().read_root(Path::new(name), dir.path())
}

fn read_json(dir: &TempDir, name: &str) -> Value {
    let node = read(dir, name).unwrap();
    assert!(node.is_fully_resolved());
    node.to_json().unwrap()
}

#[test]
fn test_plain_config() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "plain.json", &json!({"config": {"a": 1, "b": "x"}}));

    assert_eq!(read_json(&dir, "plain.json"), json!({"a": 1, "b": "x"}));
}

#[test]
fn test_reference_resolution() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "ref.json", &json!({"config": {"a": 1, "&b": "/a"}}));

    assert_eq!(read_json(&dir, "ref.json"), json!({"a": 1, "b": 1}));
}

#[test]
fn test_derived_object_chain() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "derived.json",
        &json!({"config": {
            "base1": {"x": 1, "y": 2},
            "base2": {"y": 20, "z": 30},
            "&derived": {"base": ["/base1", "/base2"], "config": {"y": 200}}
        }}),
    );

    let result = read_json(&dir, "derived.json");
    assert_eq!(result["derived"], json!({"x": 1, "y": 200, "z": 30}));
}

#[test]
fn test_include_overlay() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "a.json", &json!({"config": {"k": 1, "m": 2}}));
    write_config(
        dir.path(),
        "b.json",
        &json!({
            "includes": [{"file_path": "a.json"}],
            "config": {"k": 10}
        }),
    );

    assert_eq!(read_json(&dir, "b.json"), json!({"k": 10, "m": 2}));
}

#[test]
fn test_later_includes_override_earlier_ones() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "first.json", &json!({"config": {"v": 1, "only_first": true}}));
    write_config(dir.path(), "second.json", &json!({"config": {"v": 2}}));
    write_config(
        dir.path(),
        "root.json",
        &json!({
            "includes": [
                {"file_path": "first.json"},
                {"file_path": "second.json"}
            ]
        }),
    );

    assert_eq!(
        read_json(&dir, "root.json"),
        json!({"v": 2, "only_first": true})
    );
}

#[test]
fn test_relocation() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "move.json", &json!({"config": {"x": {"y": 7}}}));

    let node = ConfigReader::new()
        .read(Path::new("move.json"), dir.path(), "/x", "/outer/inner")
        .unwrap();
    assert_eq!(node.to_json(), Some(json!({"outer": {"inner": {"y": 7}}})));
}

#[test]
fn test_unresolvable_cycle() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "cycle.json",
        &json!({"config": {"&a": "/b", "&b": "/a"}}),
    );

    let error = read(&dir, "cycle.json").unwrap_err();
    assert!(matches!(error, ConfigError::Unresolved { .. }));
}

#[test]
fn test_derived_array() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "array.json",
        &json!({"config": {
            "v": 5,
            "&arr": [
                {"element": 1},
                {"&element": "/v"},
                {"#element": {"raw": true}}
            ]
        }}),
    );

    let result = read_json(&dir, "array.json");
    assert_eq!(result["arr"], json!([1, 5, {"raw": true}]));
}

#[test]
fn test_include_with_source_and_destination_nodes() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "library.json",
        &json!({"config": {"v": 1, "sub": {"&r": "/v", "w": 2}}}),
    );
    write_config(
        dir.path(),
        "root.json",
        &json!({
            "includes": [{
                "file_path": "library.json",
                "source_node": "/sub",
                "destination_node": "/mounted"
            }],
            "config": {"extra": true}
        }),
    );

    // The include resolves its references before the sub-tree is
    // extracted and re-wrapped under the destination.
    assert_eq!(
        read_json(&dir, "root.json"),
        json!({"mounted": {"r": 1, "w": 2}, "extra": true})
    );
}

#[test]
fn test_include_paths_resolve_against_including_file() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "nested/inner.json", &json!({"config": {"deep": 1}}));
    write_config(
        dir.path(),
        "nested/mid.json",
        &json!({
            "includes": [{"file_path": "inner.json"}],
            "config": {"mid": 2}
        }),
    );
    write_config(
        dir.path(),
        "root.json",
        &json!({"includes": [{"file_path": "nested/mid.json"}]}),
    );

    assert_eq!(read_json(&dir, "root.json"), json!({"deep": 1, "mid": 2}));
}

#[test]
fn test_references_across_include_layers() {
    // References are resolved after all layers are assembled, so the
    // root file can reference nodes an include contributed.
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "values.json", &json!({"config": {"defaults": {"port": 8080}}}));
    write_config(
        dir.path(),
        "root.json",
        &json!({
            "includes": [{"file_path": "values.json"}],
            "config": {"&port": "/defaults/port"}
        }),
    );

    assert_eq!(
        read_json(&dir, "root.json"),
        json!({"defaults": {"port": 8080}, "port": 8080})
    );
}

#[test]
fn test_null_config_contributes_no_overrides() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "base.json", &json!({"config": {"kept": 1}}));
    write_config(
        dir.path(),
        "root.json",
        &json!({
            "includes": [{"file_path": "base.json"}],
            "config": null
        }),
    );

    assert_eq!(read_json(&dir, "root.json"), json!({"kept": 1}));
}

#[test]
fn test_file_without_members_is_empty_object() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "empty.json", &json!({}));

    assert_eq!(read_json(&dir, "empty.json"), json!({}));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let error = read(&dir, "absent.json").unwrap_err();
    assert!(matches!(error, ConfigError::FileNotFound(_)));
}

#[test]
fn test_malformed_json_reports_context() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.json"), r#"{"config": {"a": }}"#).unwrap();

    let error = read(&dir, "broken.json").unwrap_err();
    let ConfigError::JsonParse {
        line,
        context_before,
        ..
    } = error
    else {
        panic!("expected a JSON parse error, got {error}");
    };
    assert_eq!(line, 1);
    assert!(context_before.contains("\"a\":"));
}

#[test]
fn test_root_must_be_object() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "list.json", &json!([1, 2, 3]));

    let error = read(&dir, "list.json").unwrap_err();
    assert!(matches!(error, ConfigError::Schema { .. }));
}

#[test]
fn test_includes_must_be_array() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "bad.json", &json!({"includes": {"file_path": "x"}}));

    let error = read(&dir, "bad.json").unwrap_err();
    assert!(matches!(error, ConfigError::Schema { .. }));
}

#[test]
fn test_include_missing_file_path_member() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "bad.json", &json!({"includes": [{"source_node": "/"}]}));

    let error = read(&dir, "bad.json").unwrap_err();
    let ConfigError::Schema { message, .. } = error else {
        panic!("expected a schema error");
    };
    assert!(message.contains("file_path"));
}

#[test]
fn test_unsupported_include_type() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "bad.json",
        &json!({"includes": [{"type": "SomethingElse", "file_path": "x.json"}]}),
    );

    let error = read(&dir, "bad.json").unwrap_err();
    let ConfigError::UnsupportedIncludeType {
        include_type,
        index,
    } = error
    else {
        panic!("expected an unsupported include type error, got {error}");
    };
    assert_eq!(include_type, "SomethingElse");
    assert_eq!(index, 0);
}

#[test]
fn test_include_errors_carry_index_and_path() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "ok.json", &json!({"config": {"fine": true}}));
    fs::write(dir.path().join("broken.json"), "not json").unwrap();
    write_config(
        dir.path(),
        "root.json",
        &json!({"includes": [
            {"file_path": "ok.json"},
            {"file_path": "broken.json"}
        ]}),
    );

    let error = read(&dir, "root.json").unwrap_err();
    let ConfigError::Include { index, path, source } = error else {
        panic!("expected an include error, got {error}");
    };
    assert_eq!(index, 1);
    assert_eq!(path, PathBuf::from("broken.json"));
    assert!(matches!(*source, ConfigError::JsonParse { .. }));
}

#[test]
fn test_invalid_source_node() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "c.json", &json!({"config": {}}));

    let reader = ConfigReader::new();
    let error = reader
        .read(Path::new("c.json"), dir.path(), "relative", "/")
        .unwrap_err();
    assert!(matches!(error, ConfigError::InvalidSourceNode(_)));

    let error = reader
        .read(Path::new("c.json"), dir.path(), "/", "/a//b")
        .unwrap_err();
    assert!(matches!(error, ConfigError::InvalidDestinationNode(_)));
}

#[test]
fn test_missing_relocation_source() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "c.json", &json!({"config": {"a": 1}}));

    let error = ConfigReader::new()
        .read(Path::new("c.json"), dir.path(), "/absent", "/")
        .unwrap_err();
    assert!(matches!(error, ConfigError::SourceNodeNotFound(_)));
}

#[test]
fn test_max_cycles_bounds_include_resolution() {
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "chain.json",
        &json!({"config": {
            "base": {"a": 1},
            "&mid": {"base": "/base"},
            "&leaf": {"base": "/mid"}
        }}),
    );

    let mut reader = ConfigReader::new();
    reader.set_reference_resolution_max_cycles(2);
    assert!(reader.read_root(Path::new("chain.json"), dir.path()).is_ok());

    reader.set_reference_resolution_max_cycles(1);
    let error = reader
        .read_root(Path::new("chain.json"), dir.path())
        .unwrap_err();
    assert!(matches!(error, ConfigError::Unresolved { cycles: 1 }));
}

#[test]
fn test_custom_include_reader() {
    /// Include reader that serves a fixed tree for any path.
    struct Fixture;

    impl IncludeReader for Fixture {
        fn read_include(
            &self,
            _file_path: &Path,
            _working_dir: &Path,
            _source_node: &str,
            _destination_node: &str,
        ) -> Result<ConfigNode, ConfigError> {
            let Value::Object(object) = json!({"injected": {"from": "fixture"}}) else {
                unreachable!();
            };
            strata_config::config_node_from_json(&object, &strata_config::NodePath::root())
        }
    }

    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "root.json",
        &json!({
            "includes": [{"type": "Fixture", "file_path": "ignored.json"}],
            "config": {"own": 1}
        }),
    );

    let mut reader = ConfigReader::new();
    assert!(reader.register_include_reader("Fixture", Box::new(Fixture)));

    let node = reader.read_root(Path::new("root.json"), dir.path()).unwrap();
    assert_eq!(
        node.to_json(),
        Some(json!({"injected": {"from": "fixture"}, "own": 1}))
    );
}

#[test]
fn test_decorator_fidelity_through_pipeline() {
    // A `#` value survives assembly, resolution, and relocation as a
    // single opaque leaf.
    let blob = json!({"nested": [1, {"deep": null}], "flag": false});
    let dir = TempDir::new().unwrap();
    write_config(
        dir.path(),
        "opaque.json",
        &json!({"config": {"#payload": blob}}),
    );

    let node = ConfigReader::new()
        .read(Path::new("opaque.json"), dir.path(), "/payload", "/moved")
        .unwrap();
    assert_eq!(node.to_json(), Some(json!({"moved": blob})));
}

#[test]
fn test_output_invariants() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), "inv.json", &json!({"config": {
        "plain": {"a": [1, 2, {"b": null}]},
        "&link": "/plain/a/2",
        "&derived": {"base": "/plain", "config": {"extra": true}}
    }}));

    let node = read(&dir, "inv.json").unwrap();
    // A returned tree is always fully resolved; to_json only succeeds on
    // such trees, so a successful projection double-checks it.
    assert!(node.is_fully_resolved());
    assert!(node.to_json().is_some());
}
