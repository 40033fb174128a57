//! The view host: whatever owns the buffers and windows the log is shown in.
//!
//! The sink never holds host objects directly. It holds identifiers, and every
//! identifier may go stale at any moment: the host can wipe a buffer, close a
//! window, or hand out a recycled id without telling anyone. The trait below is
//! the whole surface the sink is allowed to touch.

mod headless;

use std::fmt;

pub use headless::HeadlessHost;

/// Opaque buffer identifier handed out by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u64);

/// Opaque window identifier handed out by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u64);

/// Identifier of an installed lifecycle subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer {}", self.0)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window {}", self.0)
    }
}

/// A buffer together with the window last seen showing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub buffer: BufferId,
    pub window: WindowId,
}

/// What to ask the host for when the log surface has to be (re)created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSpec {
    /// Well-known buffer name. Also used to re-find the buffer later.
    pub filename: String,
    pub filetype: String,
    /// Host command used to open the window (e.g. `botright 30vnew`).
    pub open_command: String,
    /// Whether the new window should take focus.
    pub focus_on_open: bool,
}

/// Lifecycle events a subscription can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceEventKind {
    /// The buffer was wiped out.
    Destroy,
    /// The user entered the buffer.
    Enter,
}

/// A lifecycle event delivered by the host's loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceEvent {
    pub subscription: SubscriptionId,
    pub kind: SurfaceEventKind,
}

/// A host call that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("host could not create a buffer: {0}")]
    CreateFailed(String),

    #[error("{0} is not valid")]
    InvalidBuffer(BufferId),

    #[error("{0} is not valid")]
    InvalidWindow(WindowId),

    #[error("lines {start}..{end} are outside {buffer}")]
    LinesOutOfRange {
        buffer: BufferId,
        start: usize,
        end: usize,
    },

    #[error("cursor position {line}:{col} is outside {window}")]
    CursorOutOfRange {
        window: WindowId,
        line: usize,
        col: usize,
    },
}

/// Operations the sink needs from the host.
///
/// Lines are 0-indexed and ranges are end-exclusive, except for cursor
/// positions, which are 1-indexed lines like every editor shows them.
pub trait ViewHost {
    /// Create (or reuse, if one with this name exists) the log buffer and open
    /// a window on it.
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Result<SurfaceHandle, HostError>;

    /// Look a buffer up by its name.
    fn find_buffer(&self, name: &str) -> Option<BufferId>;

    /// The first live window currently displaying `buffer`.
    fn window_for_buffer(&self, buffer: BufferId) -> Option<WindowId>;

    /// Whether `buffer` is alive and still carries `name`.
    fn is_buffer_valid(&self, buffer: BufferId, name: &str) -> bool;

    fn is_window_valid(&self, window: WindowId) -> bool;

    /// All live windows, across every tab.
    fn list_windows(&self) -> Vec<WindowId>;

    fn current_window(&self) -> Option<WindowId>;

    fn current_buffer(&self) -> Option<BufferId>;

    fn set_cursor(&mut self, window: WindowId, line: usize, col: usize) -> Result<(), HostError>;

    fn line_count(&self, buffer: BufferId) -> Result<usize, HostError>;

    fn get_lines(&self, buffer: BufferId) -> Result<Vec<String>, HostError>;

    /// Replace lines `start..end` of `buffer` with `lines`.
    fn set_lines(
        &mut self,
        buffer: BufferId,
        start: usize,
        end: usize,
        lines: &[String],
    ) -> Result<(), HostError>;

    fn destroy_window(&mut self, window: WindowId) -> Result<(), HostError>;

    /// Install callbacks for `kinds` on `buffer`. Events come back through
    /// the host's loop tagged with the returned id.
    fn subscribe(&mut self, buffer: BufferId, kinds: &[SurfaceEventKind]) -> SubscriptionId;

    /// Remove a subscription. Unknown ids are ignored.
    fn unsubscribe(&mut self, id: SubscriptionId);
}
