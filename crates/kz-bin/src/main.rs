//! Kanaz entrypoint.
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

mod commands;
mod pager;

const LOG_FILE: &str = "kanaz.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "kanaz", version, about = "Viewer and tools for very large text files")]
struct Args {
    /// Configuration file path (overrides discovery of `kanaz.toml`).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count newline-terminated lines, stopping at the configured scan cap.
    Count { path: PathBuf },
    /// Print the lines around a 0-based line number.
    Window {
        path: PathBuf,
        #[arg(long)]
        line: usize,
        /// Lines on each side (defaults to `large_file.context_lines`).
        #[arg(long)]
        context: Option<usize>,
    },
    /// Stream the file in fixed-size chunks.
    Chunks {
        path: PathBuf,
        /// Bytes per chunk (defaults to `large_file.chunk_size_bytes`).
        #[arg(long = "chunk-size")]
        chunk_size: Option<usize>,
        /// Write chunk text instead of a per-chunk summary.
        #[arg(long)]
        dump: bool,
    },
    /// Report size, line count and the rendering mode the file would get.
    Inspect { path: PathBuf },
    /// Open the interactive viewer.
    View {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = ViewMode::Auto)]
        mode: ViewMode,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    /// Decide from file size and line count.
    Auto,
    Virtual,
    Full,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self, log_dir: &Path) -> Result<()> {
        let log_path = log_dir.join(LOG_FILE);
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Subscriber already installed; dropping the guard stops this writer.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    startup.configure_logging(Path::new("."))?;
    AppStartup::install_panic_hook();

    let config = core_config::load_from(args.config.clone())?;
    info!(
        target: "runtime",
        config_override = args.config.is_some(),
        config_loaded = config.raw.is_some(),
        "startup"
    );
    let lf = config.file.large_file.clone();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Count { path } => commands::count(path, &lf, &mut out).await?,
        Command::Window {
            path,
            line,
            context,
        } => {
            let context = context.unwrap_or(lf.context_lines);
            commands::window(path, line, context, &mut out).await?
        }
        Command::Chunks {
            path,
            chunk_size,
            dump,
        } => {
            let chunk_size = chunk_size.unwrap_or(lf.chunk_size_bytes);
            commands::chunks(path, chunk_size, dump, &mut out).await?
        }
        Command::Inspect { path } => commands::inspect(path, &lf, &mut out).await?,
        Command::View { path, mode } => {
            drop(out);
            let use_virtual = match mode {
                ViewMode::Virtual => true,
                ViewMode::Full => false,
                ViewMode::Auto => {
                    commands::profile(path.clone(), &lf)
                        .await?
                        .decision
                        .use_virtual_rendering
                }
            };
            pager::run(path, config, use_virtual).await?;
            info!(target: "runtime", "shutdown");
            return Ok(());
        }
    }
    out.flush()?;
    info!(target: "runtime", "shutdown");
    Ok(())
}
