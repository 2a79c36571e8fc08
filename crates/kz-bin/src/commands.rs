//! Non-interactive subcommands. Each writes its report to the given sink so
//! the output can be checked without a terminal.

use anyhow::{Context, Result};
use core_config::LargeFileConfig;
use core_largefile::tasks::{count_lines_async, load_window_async, spawn_chunk_stream};
use core_largefile::{CancelToken, FileProfile, RenderPolicy};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

pub async fn count<W: Write>(path: PathBuf, cfg: &LargeFileConfig, out: &mut W) -> Result<()> {
    let lc = count_lines_async(path.clone(), cfg.scan_cap, CancelToken::new())
        .await
        .with_context(|| format!("counting lines of {}", path.display()))?;
    info!(target: "runtime", count = lc.count, capped = lc.capped, "count_complete");
    if lc.capped {
        writeln!(out, "{}+ (scan stopped at cap)", lc.count)?;
    } else {
        writeln!(out, "{}", lc.count)?;
    }
    Ok(())
}

/// Print the lines around `line` (0-based), each prefixed by its number.
pub async fn window<W: Write>(
    path: PathBuf,
    line: usize,
    context: usize,
    out: &mut W,
) -> Result<()> {
    let w = load_window_async(path.clone(), line, context, CancelToken::new())
        .await
        .with_context(|| format!("loading lines of {}", path.display()))?;
    let width = w.end_line().max(1).to_string().len();
    for (n, text) in w.numbered() {
        writeln!(out, "{n:>width$} {text}")?;
    }
    if w.is_empty() {
        match w.total_lines {
            Some(total) => writeln!(out, "(line {line} is past the end; file has {total} lines)")?,
            None => writeln!(out, "(no lines)")?,
        }
    }
    Ok(())
}

/// Stream the file in chunks and summarize each one. With `dump` the chunk
/// text itself is written instead.
pub async fn chunks<W: Write>(
    path: PathBuf,
    chunk_size: usize,
    dump: bool,
    out: &mut W,
) -> Result<()> {
    let (mut rx, handle) = spawn_chunk_stream(path.clone(), chunk_size, CancelToken::new());
    let mut n = 0usize;
    let mut bytes = 0u64;
    while let Some(item) = rx.recv().await {
        let chunk = item.with_context(|| format!("reading chunks of {}", path.display()))?;
        if dump {
            out.write_all(chunk.text.as_bytes())?;
        } else {
            writeln!(
                out,
                "chunk {n} offset={} len={} chars={}",
                chunk.offset,
                chunk.len,
                chunk.text.chars().count()
            )?;
        }
        n += 1;
        bytes += chunk.len as u64;
    }
    handle.await?;
    info!(target: "runtime", chunks = n, bytes, "chunks_complete");
    if !dump {
        writeln!(out, "{n} chunks, {bytes} bytes")?;
    }
    Ok(())
}

pub async fn inspect<W: Write>(path: PathBuf, cfg: &LargeFileConfig, out: &mut W) -> Result<()> {
    let profile = profile(path, cfg).await?;
    writeln!(out, "path:  {}", profile.path.display())?;
    writeln!(out, "size:  {} bytes", profile.size_bytes)?;
    let suffix = if profile.lines.capped { "+" } else { "" };
    writeln!(out, "lines: {}{suffix}", profile.lines.count)?;
    let mode = if profile.decision.use_virtual_rendering {
        "virtual"
    } else {
        "full"
    };
    writeln!(out, "mode:  {mode}")?;
    Ok(())
}

/// Size and bounded line count of `path` plus the rendering decision under
/// the configured thresholds.
pub async fn profile(path: PathBuf, cfg: &LargeFileConfig) -> Result<FileProfile> {
    let policy = RenderPolicy::new(cfg.memory_threshold_bytes, cfg.line_count_threshold);
    let scan_cap = cfg.scan_cap;
    let display = path.display().to_string();
    let profile = tokio::task::spawn_blocking(move || {
        policy.inspect(&path, scan_cap, &CancelToken::new())
    })
    .await?
    .with_context(|| format!("inspecting {display}"))?;
    Ok(profile)
}
