// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn create_window_records_call_and_serves_default_pane() {
    let mux = FakeMultiplexer::new();
    mux.set_default_pane("? for shortcuts");

    let target = mux.create_window("claude-1", "claude", None).await.unwrap();
    assert_eq!(target, "fake:claude-1");
    assert_eq!(mux.capture_pane(&target, -30).await.unwrap(), "? for shortcuts");

    let calls = mux.calls();
    assert!(matches!(
        &calls[0],
        MuxCall::CreateWindow { name, .. } if name == "claude-1"
    ));
}

#[tokio::test]
async fn set_pane_overrides_window_output() {
    let mux = FakeMultiplexer::new();
    let target = mux.create_window("w", "cmd", None).await.unwrap();

    mux.set_pane(&target, "rate limit exceeded");
    assert_eq!(
        mux.capture_pane(&target, -30).await.unwrap(),
        "rate limit exceeded"
    );
}

#[tokio::test]
async fn liveness_follows_kill_and_set_alive() {
    let mux = FakeMultiplexer::new();
    let target = mux.create_window("w", "cmd", None).await.unwrap();
    assert!(mux.is_window_alive(&target).await.unwrap());

    mux.kill_window(&target).await.unwrap();
    assert!(!mux.is_window_alive(&target).await.unwrap());

    mux.set_alive(&target, true);
    assert!(mux.is_window_alive(&target).await.unwrap());

    assert!(!mux.is_window_alive("fake:unknown").await.unwrap());
}

#[tokio::test]
async fn pipe_sizes_grow_through_window_pipe() {
    let mux = FakeMultiplexer::new();
    let target = mux.create_window("w", "cmd", None).await.unwrap();
    let pipe = PathBuf::from("/tmp/w.pipe");
    mux.start_pipe_pane(&target, &pipe).await.unwrap();

    assert_eq!(mux.get_file_size(&pipe).await, 0);
    mux.grow_pipe(&target, 100);
    assert_eq!(mux.get_file_size(&pipe).await, 100);
    mux.grow_pipe(&target, 50);
    assert_eq!(mux.get_file_size(&pipe).await, 150);

    mux.set_pipe_tail(&pipe, "recent output");
    assert_eq!(mux.read_pipe_tail(&pipe, 10).await, "recent output");
}

#[tokio::test]
async fn send_to_missing_window_is_not_found() {
    let mux = FakeMultiplexer::new();
    let result = mux.send_text("fake:ghost", "hello").await;
    assert!(matches!(result, Err(MultiplexerError::NotFound(_))));
}

#[tokio::test]
async fn sent_text_filters_by_target() {
    let mux = FakeMultiplexer::new();
    let a = mux.create_window("a", "cmd", None).await.unwrap();
    let b = mux.create_window("b", "cmd", None).await.unwrap();

    mux.send_text(&a, "first").await.unwrap();
    mux.send_text(&b, "other").await.unwrap();
    mux.send_text(&a, "second").await.unwrap();

    assert_eq!(mux.sent_text(&a), vec!["first", "second"]);
}

#[tokio::test]
async fn fail_next_create_fails_once() {
    let mux = FakeMultiplexer::new();
    mux.fail_next_create("no space");

    let err = mux.create_window("w", "cmd", None).await.unwrap_err();
    assert!(matches!(err, MultiplexerError::SpawnFailed(_)));

    assert!(mux.create_window("w", "cmd", None).await.is_ok());
}

#[tokio::test]
async fn kill_session_kills_all_windows() {
    let mux = FakeMultiplexer::new();
    mux.ensure_session().await.unwrap();
    let a = mux.create_window("a", "cmd", None).await.unwrap();
    let b = mux.create_window("b", "cmd", None).await.unwrap();

    mux.kill_session().await.unwrap();
    assert!(!mux.session_exists().await.unwrap());
    assert!(!mux.is_window_alive(&a).await.unwrap());
    assert!(!mux.is_window_alive(&b).await.unwrap());
}
