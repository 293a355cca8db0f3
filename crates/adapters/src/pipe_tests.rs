// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

fn fixture(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker-test.pipe");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[tokio::test]
async fn file_size_of_missing_file_is_zero() {
    assert_eq!(file_size(Path::new("/nonexistent/worker.pipe")).await, 0);
}

#[tokio::test]
async fn file_size_tracks_appends() {
    let (_dir, path) = fixture("12345");
    assert_eq!(file_size(&path).await, 5);

    let mut existing = std::fs::read(&path).unwrap();
    existing.extend_from_slice(b"678");
    std::fs::write(&path, existing).unwrap();
    assert_eq!(file_size(&path).await, 8);
}

#[tokio::test]
async fn read_tail_of_missing_file_is_empty() {
    assert_eq!(read_tail(Path::new("/nonexistent/worker.pipe"), 10).await, "");
}

#[tokio::test]
async fn read_tail_returns_last_lines_only() {
    let content: String = (1..=100).map(|i| format!("line {}\n", i)).collect();
    let (_dir, path) = fixture(&content);

    let tail = read_tail(&path, 3).await;
    assert_eq!(tail, "line 98\nline 99\nline 100");
}

#[tokio::test]
async fn read_tail_strips_ansi_sequences() {
    let (_dir, path) = fixture("\u{1b}[32mok\u{1b}[0m\n\u{1b}[1mdone\u{1b}[0m\n");
    let tail = read_tail(&path, 5).await;
    assert_eq!(tail, "ok\ndone");
}

#[tokio::test]
async fn read_tail_is_bounded_on_huge_files() {
    // 1 MB of a single long line; the reader must stop after 32 KB
    let content = "x".repeat(1024 * 1024);
    let (_dir, path) = fixture(&content);

    let tail = read_tail(&path, 10).await;
    assert_eq!(tail.len(), 32 * 1024);
}

#[tokio::test]
async fn read_tail_handles_short_files() {
    let (_dir, path) = fixture("only\ntwo\n");
    assert_eq!(read_tail(&path, 50).await, "only\ntwo");
}
