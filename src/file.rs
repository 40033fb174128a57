//! The physical log file: an append-only mirror of the surface.
//!
//! Writes go to an explicit offset that the writer tracks itself. The offset
//! only moves by the byte count a write reports, so a failed write leaves it
//! where it was and the next line lands on the same spot.
//!
//! ```text
//! <cache>/flutter-log/logs/
//!   <sha256 of cwd>.log
//! ```

use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

/// An open file the writer can address by offset.
pub trait LogDescriptor {
    /// Write `bytes` starting at `offset`, returning how many were written.
    fn write_at(&mut self, bytes: &[u8], offset: u64) -> io::Result<usize>;

    fn set_len(&mut self, len: u64) -> io::Result<()>;

    fn size(&self) -> io::Result<u64>;

    /// Flush everything to stable storage.
    fn sync(&mut self) -> io::Result<()>;
}

impl LogDescriptor for fs::File {
    fn write_at(&mut self, bytes: &[u8], offset: u64) -> io::Result<usize> {
        self.seek(SeekFrom::Start(offset))?;
        self.write(bytes)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        fs::File::set_len(self, len)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Where log directories and files come from.
pub trait FileSystem {
    type Descriptor: LogDescriptor;

    /// Create `path` and its parents (mode 755).
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Open or create the log file (mode 644), truncating it if `overwrite`.
    fn open_log(&self, path: &Path, overwrite: bool) -> io::Result<Self::Descriptor>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    type Descriptor = fs::File;

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder.create(path)
    }

    fn open_log(&self, path: &Path, overwrite: bool) -> io::Result<fs::File> {
        let mut options = fs::OpenOptions::new();
        options.read(true).write(true).create(true).truncate(overwrite);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        options.open(path)
    }
}

/// An open log file plus the offset of the next write.
#[derive(Debug)]
pub struct PhysicalLogFile<D> {
    path: PathBuf,
    descriptor: D,
    offset: u64,
}

impl<D: LogDescriptor> PhysicalLogFile<D> {
    /// Open the log at `path`.
    ///
    /// With `overwrite` the file starts empty; otherwise writing resumes at
    /// its current end.
    pub fn open<F>(fs: &F, path: impl Into<PathBuf>, overwrite: bool) -> io::Result<Self>
    where
        F: FileSystem<Descriptor = D>,
    {
        let path = path.into();
        let mut descriptor = fs.open_log(&path, overwrite)?;
        let offset = if overwrite {
            descriptor.set_len(0)?;
            0
        } else {
            descriptor.size()?
        };
        debug!(path = %path.display(), offset, "opened log file");
        Ok(Self {
            path,
            descriptor,
            offset,
        })
    }

    /// Write `bytes` at the tracked offset and advance by what was written.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let written = self.descriptor.write_at(bytes, self.offset)?;
        self.offset += written as u64;
        Ok(written)
    }

    /// Empty the file and rewind.
    pub fn truncate(&mut self) -> io::Result<()> {
        self.descriptor.set_len(0)?;
        self.offset = 0;
        Ok(())
    }

    /// Size of the file as the filesystem sees it.
    pub fn size(&self) -> io::Result<u64> {
        self.descriptor.size()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and release the descriptor.
    pub fn close(mut self) -> io::Result<()> {
        self.descriptor.sync()?;
        debug!(path = %self.path.display(), "closed log file");
        Ok(())
    }
}
