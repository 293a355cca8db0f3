// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Random prefix for this test run to avoid conflicts with parallel test runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("hv{:04x}", nanos & 0xFFFF)
});

/// Counter for generating unique window names across tests.
static WINDOW_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_name(suffix: &str) -> String {
    let id = WINDOW_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

fn test_adapter() -> TmuxMultiplexer {
    TmuxMultiplexer::with_session(format!("{}-sess", *TEST_PREFIX))
}

/// Check if tmux is available on this system
fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! fail_if_no_tmux {
    () => {
        if !tmux_available() {
            panic!("tmux is required but not available");
        }
    };
}

#[tokio::test]
#[serial(tmux)]
async fn ensure_session_is_idempotent() {
    fail_if_no_tmux!();
    let mux = test_adapter();

    mux.ensure_session().await.unwrap();
    assert!(mux.session_exists().await.unwrap());
    mux.ensure_session().await.unwrap();

    mux.kill_session().await.unwrap();
    assert!(!mux.session_exists().await.unwrap());
}

#[tokio::test]
#[serial(tmux)]
async fn ensure_session_revalidates_cached_flag() {
    fail_if_no_tmux!();
    let mux = test_adapter();

    mux.ensure_session().await.unwrap();
    // Kill behind the adapter's back; ensure_session must recreate
    let _ = std::process::Command::new("tmux")
        .args(["kill-session", "-t", &format!("{}-sess", *TEST_PREFIX)])
        .output();
    mux.ensure_session().await.unwrap();
    assert!(mux.session_exists().await.unwrap());

    mux.kill_session().await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn create_window_returns_target_and_runs_command() {
    fail_if_no_tmux!();
    let mux = test_adapter();
    mux.ensure_session().await.unwrap();
    let name = unique_name("win");

    let target = mux
        .create_window(&name, "echo window-test-output && sleep 60", None)
        .await
        .unwrap();
    assert!(target.ends_with(&format!(":{}", name)));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let output = mux.capture_pane(&target, -10).await.unwrap();
    assert!(output.contains("window-test-output"));

    mux.kill_session().await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn create_window_replaces_existing_window() {
    fail_if_no_tmux!();
    let mux = test_adapter();
    mux.ensure_session().await.unwrap();
    let name = unique_name("replace");

    let t1 = mux.create_window(&name, "sleep 60", None).await.unwrap();
    let t2 = mux.create_window(&name, "sleep 60", None).await.unwrap();
    assert_eq!(t1, t2);
    assert!(mux.is_window_alive(&t2).await.unwrap());

    mux.kill_session().await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn send_text_types_literally_and_submits() {
    fail_if_no_tmux!();
    let mux = test_adapter();
    mux.ensure_session().await.unwrap();
    let name = unique_name("text");

    let target = mux.create_window(&name, "cat", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Text with characters tmux would otherwise treat as key names
    mux.send_text(&target, "Enter C-c $literal").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let output = mux.capture_pane(&target, -10).await.unwrap();
    assert!(output.contains("Enter C-c $literal"));

    mux.kill_session().await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn pipe_pane_mirrors_output_to_file() {
    fail_if_no_tmux!();
    let mux = test_adapter();
    mux.ensure_session().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let pipe = dir.path().join("win.pipe");
    let name = unique_name("pipe");

    let target = mux.create_window(&name, "bash", None).await.unwrap();
    mux.start_pipe_pane(&target, &pipe).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    mux.send_keys(&target, &["echo pipe-probe".to_string(), "Enter".to_string()])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(mux.get_file_size(&pipe).await > 0);
    let tail = mux.read_pipe_tail(&pipe, 10).await;
    assert!(tail.contains("pipe-probe"), "tail: {}", tail);

    mux.stop_pipe_pane(&target).await.unwrap();
    mux.kill_session().await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn is_window_alive_false_for_missing_window() {
    fail_if_no_tmux!();
    let mux = test_adapter();
    mux.ensure_session().await.unwrap();

    let alive = mux
        .is_window_alive("nonexistent-session:nonexistent-window")
        .await
        .unwrap();
    assert!(!alive);

    mux.kill_session().await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn send_keys_to_missing_window_is_not_found() {
    fail_if_no_tmux!();
    let mux = test_adapter();
    mux.ensure_session().await.unwrap();

    let result = mux
        .send_keys("nonexistent:window", &["Enter".to_string()])
        .await;
    assert!(matches!(result, Err(MultiplexerError::NotFound(_))));

    mux.kill_session().await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn kill_window_tolerates_missing_window() {
    fail_if_no_tmux!();
    let mux = test_adapter();
    mux.ensure_session().await.unwrap();

    assert!(mux.kill_window("nonexistent:window").await.is_ok());

    mux.kill_session().await.unwrap();
}

#[test]
fn shell_quote_escapes_single_quotes() {
    assert_eq!(shell_quote("/tmp/plain.pipe"), "'/tmp/plain.pipe'");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
}

#[tokio::test]
#[serial(tmux)]
async fn commands_fail_cleanly_when_tmux_unavailable() {
    use std::env;

    let original_path = env::var("PATH").unwrap_or_default();
    env::set_var("PATH", "/nonexistent");

    let mux = TmuxMultiplexer::with_session("no-tmux-test");
    let exists = mux.session_exists().await;
    let capture = mux.capture_pane("any:win", -10).await;

    env::set_var("PATH", &original_path);

    assert!(matches!(exists, Err(MultiplexerError::CommandFailed(_))));
    assert!(matches!(capture, Err(MultiplexerError::CommandFailed(_))));
}
