use codebinder_core::estimate::{estimate, read_unit_content, EstimateParams, UNREADABLE_SENTINEL};
use tempfile::tempdir;

#[test]
fn small_content_is_floored() {
    let params = EstimateParams::default();
    assert_eq!(estimate("", &params), params.unit_floor);
    assert_eq!(estimate("fn main() {}", &params), params.unit_floor);
}

#[test]
fn large_content_scales_linearly_past_the_floor() {
    let params = EstimateParams::default();
    let content = "x".repeat(100_000);
    assert_eq!(
        estimate(&content, &params),
        100_000 * params.bytes_per_char + params.unit_overhead
    );
}

#[test]
fn floor_is_a_tuning_knob() {
    let params = EstimateParams {
        unit_floor: 0,
        ..EstimateParams::default()
    };
    assert_eq!(estimate("abc", &params), 3 * params.bytes_per_char + params.unit_overhead);
}

#[test]
fn estimates_are_reproducible() {
    let params = EstimateParams::default();
    let content = "let x = 1;\n".repeat(500);
    assert_eq!(estimate(&content, &params), estimate(&content, &params));
}

#[test]
fn unreadable_content_becomes_the_sentinel() {
    let dir = tempdir().unwrap();
    // A directory path cannot be read as a file.
    assert_eq!(read_unit_content(dir.path()), UNREADABLE_SENTINEL);
    assert_eq!(
        read_unit_content(&dir.path().join("does_not_exist.rs")),
        UNREADABLE_SENTINEL
    );
}

#[test]
fn undecodable_content_becomes_the_sentinel() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("blob.json");
    std::fs::write(&path, [0xffu8, 0xfe, 0x00, 0x9f, 0xff]).unwrap();
    assert_eq!(read_unit_content(&path), UNREADABLE_SENTINEL);
}

#[test]
fn readable_content_is_returned_verbatim() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("main.rs");
    std::fs::write(&path, "fn main() {}\n").unwrap();
    assert_eq!(read_unit_content(&path), "fn main() {}\n");
}
