// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use regex::Regex;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

#[tokio::test(start_paused = true)]
async fn wait_for_ready_returns_on_match() {
    let mux = FakeMultiplexer::new();
    mux.set_default_pane("booting...\n? for shortcuts");
    let target = mux.create_window("w", "claude", None).await.unwrap();

    let output = wait_for_ready(
        &mux,
        &target,
        &re(r"\? for shortcuts"),
        None,
        ReadyPoll::default(),
    )
    .await
    .unwrap();
    assert!(output.contains("? for shortcuts"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_ready_dismisses_startup_dialog_then_matches() {
    let mux = FakeMultiplexer::new();
    mux.set_default_pane("Do you trust the files in this folder?\n> Yes");
    let target = mux.create_window("w", "claude", None).await.unwrap();

    let mux_clone = mux.clone();
    let target_clone = target.clone();
    let waiter = tokio::spawn(async move {
        wait_for_ready(
            &mux_clone,
            &target_clone,
            &re(r"\? for shortcuts"),
            Some(&re(r"Do you trust")),
            ReadyPoll::default(),
        )
        .await
    });

    // Let the first poll dismiss the dialog, then show the ready banner
    tokio::time::sleep(Duration::from_millis(600)).await;
    mux.set_pane(&target, "welcome\n? for shortcuts");

    let output = waiter.await.unwrap().unwrap();
    assert!(output.contains("? for shortcuts"));

    let dismissed = mux.calls().iter().any(|call| {
        matches!(call, MuxCall::SendKeys { keys, .. } if keys == &vec!["Enter".to_string()])
    });
    assert!(dismissed, "startup dialog should be dismissed with Enter");
}

#[tokio::test(start_paused = true)]
async fn wait_for_ready_times_out_with_last_capture() {
    let mux = FakeMultiplexer::new();
    mux.set_default_pane("still booting");
    let target = mux.create_window("w", "claude", None).await.unwrap();

    let output = wait_for_ready(
        &mux,
        &target,
        &re(r"never-appears"),
        None,
        ReadyPoll {
            max_wait: Duration::from_secs(2),
            poll: Duration::from_millis(100),
        },
    )
    .await
    .unwrap();
    assert_eq!(output, "still booting");
}

#[tokio::test(start_paused = true)]
async fn wait_for_ready_matches_only_trailing_region() {
    let mux = FakeMultiplexer::new();
    // The ready marker scrolled far out of the trailing 10 non-blank lines
    let mut pane = String::from("? for shortcuts\n");
    for i in 0..20 {
        pane.push_str(&format!("output line {}\n", i));
    }
    mux.set_default_pane(pane);
    let target = mux.create_window("w", "claude", None).await.unwrap();

    let output = wait_for_ready(
        &mux,
        &target,
        &re(r"\? for shortcuts"),
        None,
        ReadyPoll {
            max_wait: Duration::from_secs(1),
            poll: Duration::from_millis(100),
        },
    )
    .await
    .unwrap();
    // Timed out rather than matching scrolled-away text
    assert!(output.contains("output line 19"));
}
