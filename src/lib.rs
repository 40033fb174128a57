//! A log sink that mirrors Flutter output into an editor surface and a file.
//!
//! The [`Sink`] is the entry point. It is handed a [`ViewHost`] to show lines
//! in, a [`Notifier`] to complain through, and a [`FileSystem`] for the file
//! mirror, and it keeps working while the host shuffles buffers and windows
//! around underneath it.

pub mod autoscroll;
pub mod config;
pub mod file;
pub mod host;
pub mod notify;
pub mod paths;
pub mod sink;
pub mod surface;
pub mod version;

pub use config::{Config, SinkConfig};
pub use file::{FileSystem, OsFileSystem};
pub use host::{HeadlessHost, ViewHost};
pub use notify::Notifier;
pub use sink::{Sink, SinkError};
pub use version::{SemVer, VersionProbe};
