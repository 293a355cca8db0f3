// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn runs_a_fast_command_to_completion() {
    let mut cmd = Command::new("echo");
    cmd.arg("hello");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn reports_timeout_with_description() {
    let mut cmd = Command::new("sleep");
    cmd.arg("5");
    let err = run_with_timeout(cmd, Duration::from_millis(50), "slow thing")
        .await
        .unwrap_err();
    assert!(err.contains("slow thing timed out"), "got: {}", err);
}

#[tokio::test]
async fn reports_spawn_failure_with_description() {
    let cmd = Command::new("definitely-not-a-binary-9f3a");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "missing binary")
        .await
        .unwrap_err();
    assert!(err.contains("missing binary failed"), "got: {}", err);
}
