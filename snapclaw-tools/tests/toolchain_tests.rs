//! End-to-end dispatch tests over the built-in tool set.
//!
//! These drive the registry exactly as the agent loop does: one model-shaped
//! call at a time, results folded to strings, failures included.

use snapclaw_core::confiner::Confiner;
use snapclaw_core::llm::ToolCall;
use snapclaw_tools::builtin_registry;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        name: name.to_string(),
        args,
    }
}

fn setup() -> (tempfile::TempDir, snapclaw_core::agent::ToolRegistry) {
    let tmp = tempfile::tempdir().unwrap();
    let confiner = Arc::new(Confiner::new(tmp.path()).unwrap());
    let registry = builtin_registry(confiner, Duration::from_secs(5));
    (tmp, registry)
}

#[tokio::test]
async fn test_declares_all_four_tools() {
    let (_tmp, registry) = setup();
    let mut names: Vec<String> = registry.definitions().iter().map(|d| d.name.clone()).collect();
    names.sort();
    assert_eq!(names, ["list_files", "read_file", "run_script", "write_file"]);
}

#[tokio::test]
async fn test_write_then_read_round_trip() {
    let (tmp, registry) = setup();

    let written = registry
        .dispatch(&call(
            "write_file",
            json!({"file_path": "pkg/morelorem.txt", "content": "lorem ipsum dolor sit amet"}),
        ))
        .await
        .unwrap();
    assert_eq!(
        written,
        "Successfully wrote to \"pkg/morelorem.txt\" (26 characters written)"
    );
    assert!(tmp.path().join("pkg/morelorem.txt").is_file());

    let read = registry
        .dispatch(&call("read_file", json!({"file_path": "pkg/morelorem.txt"})))
        .await
        .unwrap();
    assert_eq!(read, "lorem ipsum dolor sit amet");
}

#[tokio::test]
async fn test_read_is_truncated_with_marker() {
    let (tmp, registry) = setup();
    std::fs::write(tmp.path().join("lorem.txt"), "a".repeat(12_000)).unwrap();

    let result = registry
        .dispatch(&call("read_file", json!({"file_path": "lorem.txt"})))
        .await
        .unwrap();
    assert!(result.contains(&"a".repeat(10_000)));
    assert!(!result.contains(&"a".repeat(10_001)));
    assert!(result.contains("truncated at 10000 characters"));
}

#[tokio::test]
async fn test_confinement_errors_are_dispatch_errors() {
    let (tmp, registry) = setup();

    let err = registry
        .dispatch(&call(
            "write_file",
            json!({"file_path": "../escape.txt", "content": "nope"}),
        ))
        .await
        .unwrap_err();
    assert!(err.starts_with("Error calling write_file:"));
    assert!(err.contains("outside the permitted working directory"));
    assert!(!tmp.path().parent().unwrap().join("escape.txt").exists());

    let err = registry
        .dispatch(&call("read_file", json!({"file_path": "/etc/passwd"})))
        .await
        .unwrap_err();
    assert!(err.contains("outside the permitted working directory"));
}

#[tokio::test]
async fn test_unknown_function_error_string() {
    let (_tmp, registry) = setup();
    let err = registry
        .dispatch(&call("doesnotexist", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err, "Unknown function: doesnotexist");
}

#[tokio::test]
async fn test_list_shows_written_files() {
    let (_tmp, registry) = setup();
    registry
        .dispatch(&call(
            "write_file",
            json!({"file_path": "a.txt", "content": "1234"}),
        ))
        .await
        .unwrap();

    let listing = registry
        .dispatch(&call("list_files", json!({})))
        .await
        .unwrap();
    assert!(listing.contains("file a.txt (4 bytes)"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_script_sees_earlier_writes() {
    use std::os::unix::fs::PermissionsExt;
    let (tmp, registry) = setup();

    // Same-turn ordering: the write lands before the script runs.
    registry
        .dispatch(&call(
            "write_file",
            json!({"file_path": "data.txt", "content": "42"}),
        ))
        .await
        .unwrap();

    let script = tmp.path().join("show.sh");
    std::fs::write(&script, "#!/bin/sh\ncat data.txt\n").unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();

    let result = registry
        .dispatch(&call("run_script", json!({"file_path": "show.sh"})))
        .await
        .unwrap();
    assert!(result.contains("42"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_script_timeout_has_no_partial_output() {
    use std::os::unix::fs::PermissionsExt;
    let tmp = tempfile::tempdir().unwrap();
    let confiner = Arc::new(Confiner::new(tmp.path()).unwrap());
    let registry = builtin_registry(confiner, Duration::from_millis(200));

    let script = tmp.path().join("slow.sh");
    std::fs::write(&script, "#!/bin/sh\necho early-line\nsleep 5\n").unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();

    let err = registry
        .dispatch(&call("run_script", json!({"file_path": "slow.sh"})))
        .await
        .unwrap_err();
    assert!(err.contains("timed out"));
    assert!(!err.contains("early-line"));
}
