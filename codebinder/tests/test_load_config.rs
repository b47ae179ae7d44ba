use std::fs::write;
use std::path::PathBuf;

use codebinder::load_config::{apply, load_config};
use codebinder_core::job::JobRequest;
use tempfile::NamedTempFile;

fn request() -> JobRequest {
    JobRequest::new(PathBuf::from("."), "out.pdf")
}

#[test]
fn loads_and_applies_all_sections() {
    let config = NamedTempFile::new().expect("creating temp config file failed");
    write(
        config.path(),
        b"collect:\n  extra_excluded_dirs: [\"docs\", \"fixtures\"]\nestimate:\n  unit_floor: 1024\n  bytes_per_char: 3\npack:\n  header_cost: 2048\n",
    )
    .expect("writing temp config failed");

    let loaded = load_config(config.path()).expect("config must load");
    let mut req = request();
    apply(&loaded, &mut req);

    assert_eq!(req.extra_excluded_dirs, vec!["docs", "fixtures"]);
    assert_eq!(req.pipeline.estimate.unit_floor, 1024);
    assert_eq!(req.pipeline.estimate.bytes_per_char, 3);
    // Untouched keys keep their defaults.
    assert_eq!(req.pipeline.estimate.unit_overhead, 5_000);
    assert_eq!(req.pipeline.header_cost, 2048);
}

#[test]
fn an_empty_config_changes_nothing() {
    let config = NamedTempFile::new().unwrap();
    write(config.path(), b"{}\n").unwrap();

    let loaded = load_config(config.path()).expect("empty mapping must load");
    let mut req = request();
    let before_floor = req.pipeline.estimate.unit_floor;
    apply(&loaded, &mut req);

    assert_eq!(req.pipeline.estimate.unit_floor, before_floor);
    assert!(req.extra_excluded_dirs.is_empty());
}

#[test]
fn a_missing_file_is_an_error() {
    assert!(load_config("/no/such/config.yaml").is_err());
}

#[test]
fn malformed_yaml_is_an_error() {
    let config = NamedTempFile::new().unwrap();
    write(config.path(), b"collect: [not: a: mapping\n").unwrap();
    assert!(load_config(config.path()).is_err());
}
