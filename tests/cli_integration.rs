// CLI integration tests for manifest, feature, and dataset flows.
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

fn cmd(dir: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_tpd");
    let mut command = Command::new(exe);
    command.current_dir(dir);
    command
}

fn run(dir: &Path, args: &[&str]) -> Output {
    cmd(dir).args(args).output().expect("run tpd")
}

fn parse_json(output: &[u8]) -> Value {
    let text = std::str::from_utf8(output).expect("utf8");
    serde_json::from_str(text.trim()).expect("valid json")
}

fn ok_json(dir: &Path, args: &[&str]) -> Value {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "tpd {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    parse_json(&output.stdout)
}

#[test]
fn put_set_get_show_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();

    let put = ok_json(dir, &["put", "data/vol.json", "vol", "[[1,2],[3,4],[5,6]]"]);
    assert_eq!(put["shape"], serde_json::json!([3, 2]));

    let init = ok_json(dir, &["init", "out/m.tpd"]);
    assert!(init["manifest"].as_str().unwrap().ends_with("out/m.tpd"));
    assert_eq!(init["path_mode"], "relative");

    let set = ok_json(dir, &["set", "out/m.tpd", "train", "raw", "data/vol.json"]);
    assert_eq!(set["key"], "vol");
    assert_eq!(set["path"], "data/vol.json");
    assert_eq!(set["baseline"], serde_json::json!([3, 2]));

    let get = ok_json(dir, &["get", "out/m.tpd", "train", "raw", "--data"]);
    assert_eq!(get["shape"], serde_json::json!([3, 2]));
    assert_eq!(get["data"][2][1], 6.0);

    let stored = std::fs::read_to_string(dir.join("out/m.tpd")).expect("manifest");
    assert!(stored.contains("../data/vol.json"));

    let show = ok_json(dir, &["show", "out/m.tpd"]);
    assert_eq!(show["splits"]["train"]["raw"]["key"], "vol");
    assert!(show["splits"]["train"]["prediction"].is_null());
    assert!(show["splits"]["test"]["baseline"].is_null());
}

#[test]
fn feature_add_list_matrix_clear_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();
    ok_json(dir, &["put", "f.json", "x", "[1,2,3]"]);
    ok_json(dir, &["put", "f.json", "y", "[[10,11],[20,21],[30,31]]"]);

    let add = ok_json(dir, &["feature", "add", "m.tpd", "test", "f.json", "--key", "x"]);
    assert_eq!(add["added"], true);
    ok_json(dir, &["feature", "add", "m.tpd", "test", "f.json", "--key", "y"]);
    let again = ok_json(dir, &["feature", "add", "m.tpd", "test", "f.json", "--key", "x"]);
    assert_eq!(again["added"], false);
    assert_eq!(again["count"], 2);

    let list = ok_json(dir, &["feature", "list", "m.tpd", "test"]);
    assert_eq!(list["features"][1]["key"], "y");
    assert_eq!(list["features"][1]["index"], 1);

    let matrix = ok_json(dir, &["feature", "matrix", "m.tpd", "test", "--data"]);
    assert_eq!(matrix["shape"], serde_json::json!([3, 3]));
    assert_eq!(matrix["data"][1], serde_json::json!([2.0, 20.0, 21.0]));

    let written = ok_json(dir, &["feature", "matrix", "m.tpd", "test", "--out", "mat.json"]);
    assert_eq!(written["key"], "test_features");
    let keys = ok_json(dir, &["keys", "mat.json"]);
    assert_eq!(keys["entries"][0]["shape"], serde_json::json!([3, 3]));

    ok_json(dir, &["feature", "clear", "m.tpd", "test"]);
    let matrix = run(dir, &["feature", "matrix", "m.tpd", "test"]);
    assert_eq!(matrix.status.code().unwrap(), 3);
}

#[test]
fn shape_mismatch_exit_code_and_error_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();
    ok_json(dir, &["put", "a.json", "vol", "[1,2,3,4]"]);
    ok_json(dir, &["put", "b.json", "vol", "[1,2,3]"]);
    ok_json(dir, &["set", "m.tpd", "train", "raw", "a.json"]);

    let set = run(dir, &["set", "m.tpd", "train", "gt", "b.json"]);
    assert_eq!(set.status.code().unwrap(), 5);
    let err = parse_json(&set.stderr);
    assert_eq!(err["error"]["kind"], "ShapeMismatch");
    assert_eq!(err["error"]["key"], "vol");
    assert!(err["error"]["hint"].is_string());

    let get = run(dir, &["get", "m.tpd", "train", "gt"]);
    assert_eq!(get.status.code().unwrap(), 3);
}

#[test]
fn not_found_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let set = run(temp.path(), &["set", "m.tpd", "train", "raw", "missing.json", "--key", "x"]);
    assert_eq!(set.status.code().unwrap(), 3);
    let err = parse_json(&set.stderr);
    assert_eq!(err["error"]["kind"], "NotFound");
}

#[test]
fn usage_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();

    let bad_split = run(dir, &["set", "m.tpd", "validation", "raw", "a.json"]);
    assert_eq!(bad_split.status.code().unwrap(), 2);

    ok_json(dir, &["put", "two.json", "a", "[1]"]);
    ok_json(dir, &["put", "two.json", "b", "[2]"]);
    let ambiguous = run(dir, &["set", "m.tpd", "train", "raw", "two.json"]);
    assert_eq!(ambiguous.status.code().unwrap(), 2);
    let err = parse_json(&ambiguous.stderr);
    assert!(err["error"]["hint"].as_str().unwrap().contains("a, b"));

    let ragged = run(dir, &["put", "r.json", "x", "[[1,2],[3]]"]);
    assert_eq!(ragged.status.code().unwrap(), 2);
}

#[test]
fn absolute_paths_flag_stores_absolute_references() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path();
    ok_json(dir, &["put", "a.json", "vol", "[1,2]"]);

    let init = ok_json(dir, &["--absolute-paths", "init", "m.tpd"]);
    assert_eq!(init["path_mode"], "absolute");
    let set = ok_json(dir, &["set", "m.tpd", "train", "raw", "a.json", "--absolute-paths"]);
    assert_eq!(set["path"], "a.json");

    let manifest: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("m.tpd")).expect("read"))
            .expect("manifest json");
    let stored = manifest["entries"]["train_raw_path"]["value"]
        .as_str()
        .expect("stored path");
    assert!(Path::new(stored).is_absolute());
}
