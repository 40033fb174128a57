//! The log sink: one object that owns everything needed to mirror a stream
//! of lines into the host's log surface and, optionally, a file on disk.
//!
//! Nothing here is fatal. A failure degrades one feature for one call, gets
//! reported through the notifier, and the next call tries again from scratch.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::autoscroll::{self, Decision};
use crate::config::SinkConfig;
use crate::file::{FileSystem, OsFileSystem, PhysicalLogFile};
use crate::host::{BufferId, HostError, SurfaceEvent, SurfaceSpec, ViewHost};
use crate::notify::{Notifier, Reporter};
use crate::paths::LOG_BUFFER_NAME;
use crate::surface::SurfaceTracker;

/// Errors that can occur while logging.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("flutter-log is not set up yet")]
    SetupRequired,

    #[error("could not open the log surface: {0}")]
    SurfaceUnavailable(#[source] HostError),

    #[error("log file error: {0}")]
    FileIo(#[from] io::Error),

    // Kept free of detail so repeats compare equal.
    #[error("failed to scroll the log window")]
    CursorPosition(#[source] HostError),
}

/// Mirrors log lines into a host surface and an optional file.
pub struct Sink<H, N, F: FileSystem = OsFileSystem> {
    host: H,
    reporter: Reporter<N>,
    fs: F,
    log_path: PathBuf,
    tracker: SurfaceTracker,
    config: Option<SinkConfig>,
    file: Option<PhysicalLogFile<F::Descriptor>>,
}

impl<H: ViewHost, N: Notifier, F: FileSystem> Sink<H, N, F> {
    /// A sink that is not set up yet. `log_path` is where the file mirror
    /// goes if the config asks for one.
    pub fn new(host: H, notifier: N, fs: F, log_path: impl Into<PathBuf>) -> Self {
        Self {
            host,
            reporter: Reporter::new(notifier),
            fs,
            log_path: log_path.into(),
            tracker: SurfaceTracker::new(LOG_BUFFER_NAME),
            config: None,
            file: None,
        }
    }

    // ── Setup and teardown ──

    /// Apply `config`. Only the first call has any effect.
    ///
    /// The log directory is created whether or not a file is wanted. An
    /// error here only means the file mirror is unavailable; the sink is set
    /// up either way and keeps logging to the surface.
    pub fn setup(&mut self, config: SinkConfig) -> Result<(), SinkError> {
        if self.config.is_some() {
            debug!("sink already set up, ignoring new config");
            return Ok(());
        }
        debug!(level = %config.level_filter(), ?config, "setting up sink");
        let wants_file = config.create_file;
        let overwrite = config.overwrite;
        self.config = Some(config);

        let opened = self.create_log_dir().and_then(|()| {
            wants_file
                .then(|| PhysicalLogFile::open(&self.fs, &self.log_path, overwrite))
                .transpose()
        });
        match opened {
            Ok(file) => {
                self.file = file;
                Ok(())
            }
            Err(e) => {
                let err = SinkError::FileIo(e);
                self.reporter.error(&err.to_string());
                Err(err)
            }
        }
    }

    fn create_log_dir(&self) -> io::Result<()> {
        match self.log_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => self.fs.create_dir_all(dir),
            _ => Ok(()),
        }
    }

    /// Flush and close the file mirror. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(file) = self.file.take()
            && let Err(e) = file.close()
        {
            self.report(&SinkError::FileIo(e));
        }
    }

    // ── Logging ──

    /// Append `line` to the surface and the file mirror.
    pub fn log(&mut self, line: &str) {
        let Some(config) = &self.config else {
            self.report(&SinkError::SetupRequired);
            return;
        };
        if !config.enabled || !config.accepts(line) {
            return;
        }
        let spec = self.surface_spec();

        let buffer = match self.tracker.ensure(&mut self.host, &spec) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.report(&SinkError::SurfaceUnavailable(e));
                return;
            }
        };
        if let Err(e) = self.append_to_surface(buffer, line) {
            self.report(&SinkError::SurfaceUnavailable(e));
            return;
        }
        self.append_to_file(line);

        match autoscroll::autoscroll(&mut self.host, self.tracker.handle()) {
            Ok(Decision::Scroll(window)) => debug!(%window, "scrolled log to end"),
            Ok(_) => {}
            Err(e) => {
                debug!("autoscroll failed: {e}");
                let err = SinkError::CursorPosition(e);
                self.reporter.error_once(&err.to_string());
            }
        }
    }

    /// Log `line` and, if `notify-errors` is set, raise it as an error.
    pub fn log_error(&mut self, line: &str) {
        self.log(line);
        if self.config.as_ref().is_some_and(|c| c.notify_errors) {
            self.reporter.error(line);
        }
    }

    fn append_to_surface(&mut self, buffer: BufferId, line: &str) -> Result<(), HostError> {
        let end = self.host.line_count(buffer)?;
        self.host.set_lines(buffer, end, end, &[line.to_string()])
    }

    fn append_to_file(&mut self, line: &str) {
        let Some(file) = &mut self.file else {
            return;
        };
        let mut payload = String::with_capacity(line.len() + 1);
        payload.push_str(line);
        payload.push('\n');
        match file.append(payload.as_bytes()) {
            Ok(written) if written < payload.len() => {
                warn!(written, expected = payload.len(), "short write to log file");
            }
            Ok(_) => {}
            Err(e) => self.report(&SinkError::FileIo(e)),
        }
    }

    // ── Queries ──

    /// Every line currently in the log buffer, or `None` without one.
    ///
    /// A buffer whose window was closed still has content.
    pub fn content(&mut self) -> Option<Vec<String>> {
        if !self.require_setup() || !self.tracker.exists(&mut self.host) {
            return None;
        }
        let buffer = self.tracker.buffer()?;
        self.host.get_lines(buffer).ok()
    }

    /// Empty the surface and truncate the file mirror.
    pub fn clear(&mut self) {
        if !self.require_setup() || !self.tracker.exists(&mut self.host) {
            return;
        }
        let Some(buffer) = self.tracker.buffer() else {
            return;
        };
        let cleared = self
            .host
            .line_count(buffer)
            .and_then(|count| self.host.set_lines(buffer, 0, count, &[]));
        if let Err(e) = cleared {
            self.report(&SinkError::SurfaceUnavailable(e));
            return;
        }
        if let Some(file) = &mut self.file
            && let Err(e) = file.truncate()
        {
            self.report(&SinkError::FileIo(e));
        }
    }

    /// Name of the buffer the log is shown in.
    pub fn filename(&self) -> &str {
        self.tracker.name()
    }

    /// Path of the file mirror, if one is open.
    pub fn filepath(&self) -> Option<&Path> {
        self.file.as_ref().map(PhysicalLogFile::path)
    }

    /// Offset the next file write goes to.
    pub fn file_offset(&self) -> Option<u64> {
        self.file.as_ref().map(PhysicalLogFile::offset)
    }

    pub fn is_setup(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.config.as_ref()
    }

    // ── Surface control ──

    pub fn exists(&mut self) -> bool {
        self.tracker.exists(&mut self.host)
    }

    pub fn is_open(&mut self) -> bool {
        self.tracker.is_open(&self.host)
    }

    /// Show the log, scrolled to the end.
    pub fn open(&mut self) {
        if !self.require_setup() {
            return;
        }
        let spec = self.surface_spec();
        if let Err(e) = self.tracker.open(&mut self.host, &spec, true) {
            self.report(&SinkError::SurfaceUnavailable(e));
        }
    }

    pub fn close(&mut self) {
        if !self.require_setup() {
            return;
        }
        if let Err(e) = self.tracker.close(&mut self.host) {
            debug!("closing log window failed: {e}");
        }
    }

    pub fn toggle(&mut self) {
        if !self.require_setup() {
            return;
        }
        let spec = self.surface_spec();
        if let Err(e) = self.tracker.toggle(&mut self.host, &spec) {
            self.report(&SinkError::SurfaceUnavailable(e));
        }
    }

    /// Feed a lifecycle event from the host's loop.
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        self.tracker.handle_event(&mut self.host, event);
    }

    // ── Collaborators ──

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn notifier(&self) -> &N {
        self.reporter.inner()
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    // ── Internals ──

    fn surface_spec(&self) -> SurfaceSpec {
        let (open_command, focus_on_open) = self
            .config
            .as_ref()
            .map(|c| (c.open_command.clone(), c.focus_on_open))
            .unwrap_or_default();
        SurfaceSpec {
            filename: self.tracker.name().to_string(),
            filetype: "log".to_string(),
            open_command,
            focus_on_open,
        }
    }

    fn require_setup(&mut self) -> bool {
        if self.config.is_none() {
            self.report(&SinkError::SetupRequired);
            return false;
        }
        true
    }

    fn report(&mut self, err: &SinkError) {
        warn!("{err}");
        self.reporter.error(&err.to_string());
    }
}
