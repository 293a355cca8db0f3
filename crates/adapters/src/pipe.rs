// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipe-file helpers.
//!
//! Each worker's pane output is mirrored to an append-only file by the
//! multiplexer. Stat'ing that file gives O(1) change detection; tailing it
//! gives the recent-output context for escalation prompts without reading
//! the whole transcript.

use crate::text::strip_ansi;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Chunk size for backwards reads from EOF.
const TAIL_CHUNK: u64 = 8 * 1024;

/// Maximum chunks read per tail (bounds a tail read at 32 KB).
const TAIL_MAX_CHUNKS: u32 = 4;

/// Size of the file in bytes, or 0 when it does not exist.
pub async fn file_size(path: &Path) -> u64 {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    }
}

/// Read approximately the last `lines` lines of the file, ANSI-stripped.
///
/// Seeks backwards from EOF in 8 KB chunks (up to 4) until enough newlines
/// are buffered. Returns an empty string when the file is missing or
/// unreadable; callers fall back to captured pane text.
pub async fn read_tail(path: &Path, lines: usize) -> String {
    let Ok(mut file) = File::open(path).await else {
        return String::new();
    };
    let len = match file.seek(SeekFrom::End(0)).await {
        Ok(len) => len,
        Err(_) => return String::new(),
    };

    let mut buf: Vec<u8> = Vec::new();
    let mut chunks = 0;
    let mut pos = len;

    while pos > 0 && chunks < TAIL_MAX_CHUNKS {
        let step = TAIL_CHUNK.min(pos);
        pos -= step;
        chunks += 1;

        let mut chunk = vec![0u8; step as usize];
        if file.seek(SeekFrom::Start(pos)).await.is_err() {
            return String::new();
        }
        if file.read_exact(&mut chunk).await.is_err() {
            return String::new();
        }
        chunk.extend_from_slice(&buf);
        buf = chunk;

        let newlines = buf.iter().filter(|&&b| b == b'\n').count();
        if newlines > lines {
            break;
        }
    }

    let text = strip_ansi(&String::from_utf8_lossy(&buf));
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
#[path = "pipe_tests.rs"]
mod tests;
