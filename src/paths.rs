//! Where log files live.
//!
//! Every working directory gets its own log file, named by the SHA-256 of the
//! directory path so that two projects never share one:
//!
//! ```text
//! <cache>/flutter-log/logs/<hex digest>.log
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Name of the buffer the log is shown in.
pub const LOG_BUFFER_NAME: &str = "__FLUTTER_DEV_LOG__";

/// The default log root: `<cache>/flutter-log/logs/`.
pub fn log_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|c| c.join("flutter-log").join("logs"))
}

/// The log file for `cwd` under `root`.
pub fn log_file_for(root: &Path, cwd: &Path) -> PathBuf {
    let digest = Sha256::digest(cwd.as_os_str().as_encoded_bytes());
    root.join(format!("{}.log", hex::encode(digest)))
}
