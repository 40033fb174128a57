//! CLI interface for flutter-log.
//!
//! Without an editor attached the sink runs against a headless host, so the
//! file mirror is what persists. Each subcommand is non-interactive.
//!
//! - `flutter-log pipe`: tee stdin into the log for the working directory.
//! - `flutter-log path|clear`: locate or empty that log.
//! - `flutter-log version`: ask the Flutter tool for its versions.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::runtime;

use flutter_log::config::Config;
use flutter_log::file::{OsFileSystem, PhysicalLogFile};
use flutter_log::notify::TracingNotifier;
use flutter_log::paths;
use flutter_log::{HeadlessHost, Sink, VersionProbe};

/// flutter-log: keep a log of your Flutter runs.
#[derive(Debug, Parser)]
#[command(name = "flutter-log", after_long_help = USAGE_HELP)]
pub struct Cli {
    /// Project directory the log belongs to. Defaults to the current one.
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Lines the in-memory log keeps while piping; the file keeps everything.
const PIPE_SCROLLBACK: usize = 10_000;

const USAGE_HELP: &str = r"Typical use:
  flutter run 2>&1 | flutter-log pipe
  tail -f $(flutter-log path)
  flutter-log clear";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read lines from stdin into the log, echoing them to stdout.
    Pipe {
        /// Treat every line as an error (raised when `notify-errors` is set).
        #[arg(long)]
        errors: bool,

        /// Don't echo lines to stdout.
        #[arg(long, short)]
        quiet: bool,
    },

    /// Print the log file path for the project.
    Path,

    /// Empty the log file for the project.
    Clear,

    /// Print the Flutter framework and Dart SDK versions.
    Version,
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();
    let log_path = log_path(cli.cwd)?;

    match cli.command {
        Command::Pipe { errors, quiet } => cmd_pipe(config, log_path, errors, quiet),
        Command::Path => {
            println!("{}", log_path.display());
            Ok(())
        }
        Command::Clear => cmd_clear(&log_path),
        Command::Version => cmd_version(config),
    }
}

/// Resolve the log file for `cwd`, or for the current directory.
fn log_path(cwd: Option<PathBuf>) -> Result<PathBuf, String> {
    let cwd = match cwd {
        Some(dir) => dir,
        None => env::current_dir().map_err(|e| format!("could not read current directory: {e}"))?,
    };
    let root = paths::log_root().ok_or("could not determine cache directory")?;
    Ok(paths::log_file_for(&root, &cwd))
}

fn cmd_pipe(config: &Config, log_path: PathBuf, errors: bool, quiet: bool) -> Result<(), String> {
    let sink_config = config.sink_config()?;
    let mut sink = Sink::new(
        HeadlessHost::with_scrollback(PIPE_SCROLLBACK),
        TracingNotifier,
        OsFileSystem,
        log_path,
    );
    // A failed file open is already reported; keep going with the surface.
    let _ = sink.setup(sink_config);

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| format!("failed to read stdin: {e}"))?;
        if errors {
            sink.log_error(&line);
        } else {
            sink.log(&line);
        }
        for event in sink.host_mut().take_events() {
            sink.handle_event(event);
        }
        if !quiet {
            writeln!(stdout, "{line}").map_err(|e| format!("failed to write stdout: {e}"))?;
        }
    }

    sink.shutdown();
    Ok(())
}

fn cmd_clear(log_path: &Path) -> Result<(), String> {
    if !log_path.exists() {
        return Ok(());
    }
    let mut file = PhysicalLogFile::open(&OsFileSystem, log_path, false)
        .map_err(|e| format!("failed to open {}: {e}", log_path.display()))?;
    file.truncate()
        .map_err(|e| format!("failed to clear {}: {e}", log_path.display()))?;
    eprintln!("Cleared {}", log_path.display());
    Ok(())
}

fn cmd_version(config: &Config) -> Result<(), String> {
    let probe = config
        .flutter_path
        .as_ref()
        .map_or_else(VersionProbe::default, VersionProbe::new)
        .with_timeout(config.probe_timeout());

    let rt = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;

    let mut reported = false;
    rt.block_on(probe.version(&mut TracingNotifier, |flutter, dart| {
        println!("Flutter {flutter}");
        println!("Dart {dart}");
        reported = true;
    }));

    if reported {
        Ok(())
    } else {
        Err("could not determine versions".to_string())
    }
}
