//! Integration tests for the heximage binary
//!
//! These run the compiled CLI against the in-process store:
//! - canvas maintenance commands succeed
//! - `get` emits the raw buffer
//! - malformed pixels are rejected with a non-zero exit

use std::process::{Command, Output};

fn heximage(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_heximage"))
        .args(["--redis-url", "memory://"])
        .args(args)
        .env("HEXIMAGE_CANVAS__WIDTH", "4")
        .env("HEXIMAGE_CANVAS__HEIGHT", "3")
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run heximage")
}

// ============================================================================
// Canvas Commands
// ============================================================================

#[test]
fn test_init_and_clear() {
    let init = heximage(&["init"]);
    assert!(init.status.success(), "{:?}", init);
    assert!(String::from_utf8_lossy(&init.stdout).contains("4x3"));

    let clear = heximage(&["clear"]);
    assert!(clear.status.success(), "{:?}", clear);
}

#[test]
fn test_get_writes_raw_buffer_to_stdout() {
    let output = heximage(&["get"]);

    assert!(output.status.success(), "{:?}", output);
    assert_eq!(output.stdout.len(), 4 * 3 * 4);
    assert!(output.stdout.iter().all(|b| *b == 0));
}

#[test]
fn test_set_and_test_pattern() {
    let set = heximage(&["set", "4", "3", "#ff0000ff", "--broadcast"]);
    assert!(set.status.success(), "{:?}", set);

    let pattern = heximage(&["test"]);
    assert!(pattern.status.success(), "{:?}", pattern);
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_set_out_of_bounds_fails() {
    let output = heximage(&["set", "5", "1", "ff0000ff"]);
    assert!(!output.status.success());
}

#[test]
fn test_set_bad_colour_fails() {
    let output = heximage(&["set", "1", "1", "red"]);
    assert!(!output.status.success());
}

#[test]
fn test_no_subcommand_prints_help() {
    let output = heximage(&[]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}
