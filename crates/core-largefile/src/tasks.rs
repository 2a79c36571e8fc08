//! Async entry points.
//!
//! Every file operation in this crate blocks on IO, so async callers run them
//! on tokio's blocking pool. Each call owns its own file handle; concurrent
//! calls never share state.

use std::io;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::chunks::{Chunk, ChunkReader};
use crate::error::{LargeFileError, Result};
use crate::line_index::{LineCount, count_lines};
use crate::window::{LineWindow, load_window};

/// Chunks buffered between the reader thread and the consumer.
pub const CHUNK_STREAM_CAP: usize = 4;

async fn run_blocking<T, F>(path: PathBuf, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&PathBuf) -> Result<T> + Send + 'static,
{
    let join_path = path.clone();
    match task::spawn_blocking(move || f(&path)).await {
        Ok(res) => res,
        Err(join_err) => Err(LargeFileError::Io {
            path: join_path,
            source: io::Error::other(join_err.to_string()),
        }),
    }
}

pub async fn count_lines_async(
    path: PathBuf,
    scan_cap: u64,
    cancel: CancelToken,
) -> Result<LineCount> {
    run_blocking(path, move |p| count_lines(p, scan_cap, &cancel)).await
}

pub async fn load_window_async(
    path: PathBuf,
    target_line: usize,
    context_lines: usize,
    cancel: CancelToken,
) -> Result<LineWindow> {
    run_blocking(path, move |p| load_window(p, target_line, context_lines, &cancel)).await
}

/// Stream the chunks of `path` from a blocking worker. The worker stops when
/// the receiver is dropped, the token fires, or the file is exhausted. Open
/// failures arrive as the first (and only) item.
pub fn spawn_chunk_stream(
    path: PathBuf,
    chunk_size: usize,
    cancel: CancelToken,
) -> (mpsc::Receiver<Result<Chunk>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHUNK_STREAM_CAP);
    let handle = task::spawn_blocking(move || {
        let reader = match ChunkReader::open(&path, chunk_size) {
            Ok(r) => r.with_cancel(cancel),
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        };
        for item in reader {
            if tx.blocking_send(item).is_err() {
                debug!(
                    target: "largefile.chunks",
                    file = %path.display(),
                    "chunk_stream_receiver_dropped"
                );
                break;
            }
        }
    });
    (rx, handle)
}
