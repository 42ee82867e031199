//! Publish Step Integration Tests
//!
//! Verifies the contents-replacement contract: after a publish, the
//! serving directory equals the build output exactly, and the build
//! output itself is never modified.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use deployd::core::publish::replace_dir_contents;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Collect relative path -> file bytes for a whole tree
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn test_publish_dir_equals_build_output_exactly() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    let publish = temp.path().join("publish");

    write(&build.join("index.html"), "<html>v2</html>");
    write(&build.join("static/js/app.js"), "console.log(2)");
    write(&build.join("static/js/app.js.map"), "{\"version\":3}");
    write(&build.join("static/css/app.css"), "body{}");

    // stale content from a previous deploy, including a nested dir
    write(&publish.join("index.html"), "<html>v1</html>");
    write(&publish.join("static/js/old.js"), "console.log(1)");
    write(&publish.join("obsolete/readme.txt"), "old");

    let before = snapshot(&build);
    replace_dir_contents(&build, &publish).unwrap();

    // set equality of relative paths and byte content
    assert_eq!(snapshot(&publish), before);

    // the build output was not modified or deleted
    assert_eq!(snapshot(&build), before);
}

#[test]
fn test_publish_into_empty_dir() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    let publish = temp.path().join("publish");

    write(&build.join("a/b/c.txt"), "deep");

    replace_dir_contents(&build, &publish).unwrap();
    assert_eq!(
        fs::read_to_string(publish.join("a/b/c.txt")).unwrap(),
        "deep"
    );
}

#[test]
fn test_repeated_publish_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let build = temp.path().join("build");
    let publish = temp.path().join("publish");

    write(&build.join("app.js"), "v1");
    replace_dir_contents(&build, &publish).unwrap();

    write(&build.join("app.js"), "v2");
    replace_dir_contents(&build, &publish).unwrap();

    assert_eq!(snapshot(&publish), snapshot(&build));
}
