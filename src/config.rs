//! Configuration for walrog
//!
//! Centralized configuration with sensible defaults. Options are validated
//! when the log is opened, not when they are built.

use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::error::{Result, WalError};

/// Default in-memory buffer ceiling (4 MiB)
pub const DEFAULT_BUFFER_SIZE: u32 = 4 * 1024 * 1024;

/// Default segment ceiling (64 MiB)
pub const DEFAULT_SEGMENT_SIZE: u32 = 64 * 1024 * 1024;

/// Main configuration for a log instance
#[derive(Debug, Clone)]
pub struct WalOptions {
    // -------------------------------------------------------------------------
    // Buffer / Segment Sizing
    // -------------------------------------------------------------------------
    /// Hard ceiling, in bytes, for one unflushed accumulation of records.
    /// A record whose encoded form is larger can never be appended.
    pub buffer_size: u32,

    /// Hard ceiling, in bytes, for the content of one segment file.
    /// Must be a non-zero multiple of `buffer_size`.
    pub segment_size: u32,

    // -------------------------------------------------------------------------
    // Durability
    // -------------------------------------------------------------------------
    /// When segment files are fsynced
    pub sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Segment Store
    // -------------------------------------------------------------------------
    /// Directory layout and file permissions, passed through to the
    /// segment store untouched.
    /// Internal structure:
    ///   {dir}/
    ///     ├── wal_000.log      (segments, numbered in creation order)
    ///     ├── wal_001.log
    ///     └── checkpoint       (opaque to the log)
    pub segment: SegmentOptions,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fdatasync after every buffer flush (safest)
    EveryFlush,

    /// Never sync implicitly; the caller decides via `Wal::sync`
    Manual,
}

/// Options consumed by the segment store
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Directory holding segment files and the checkpoint file
    pub dir: PathBuf,

    /// Permission bits for a newly created directory (unix only)
    pub dir_mode: u32,

    /// Permission bits for newly created files (unix only)
    pub file_mode: u32,

    /// Flags used to open segment and checkpoint files
    pub open_flags: OpenFlags,
}

/// File open flags for segment and checkpoint files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub create: bool,
    pub read: bool,
    pub write: bool,
    /// Refuse to open a file that already exists
    pub create_new: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            create: true,
            read: true,
            write: true,
            create_new: false,
        }
    }
}

impl OpenFlags {
    /// Translate into `std::fs::OpenOptions` carrying `mode` on unix
    pub fn to_open_options(self, mode: u32) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.create(self.create)
            .read(self.read)
            .write(self.write)
            .create_new(self.create_new);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        opts
    }
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/WalFolder"),
            dir_mode: 0o755,
            file_mode: 0o640,
            open_flags: OpenFlags::default(),
        }
    }
}

impl Default for WalOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            segment_size: DEFAULT_SEGMENT_SIZE,
            sync_strategy: WalSyncStrategy::EveryFlush,
            segment: SegmentOptions::default(),
        }
    }
}

impl WalOptions {
    /// Create a new options builder
    pub fn builder() -> WalOptionsBuilder {
        WalOptionsBuilder::default()
    }

    /// Check the sizing invariants
    ///
    /// `segment_size` must be a non-zero multiple of a non-zero
    /// `buffer_size`, otherwise a full buffer could never land in a fresh
    /// segment.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(WalError::Config("buffer_size must be greater than zero".to_string()));
        }
        if self.segment_size == 0 {
            return Err(WalError::Config("segment_size must be greater than zero".to_string()));
        }
        if self.segment_size % self.buffer_size != 0 {
            return Err(WalError::Config(format!(
                "segment_size ({}) must be a multiple of buffer_size ({})",
                self.segment_size, self.buffer_size
            )));
        }
        if !self.segment.open_flags.write {
            return Err(WalError::Config("segment files must be opened for writing".to_string()));
        }
        Ok(())
    }
}

/// Builder for WalOptions
#[derive(Default)]
pub struct WalOptionsBuilder {
    options: WalOptions,
}

impl WalOptionsBuilder {
    /// Set the directory holding segments and the checkpoint file
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.segment.dir = path.into();
        self
    }

    /// Set the buffer ceiling (in bytes)
    pub fn buffer_size(mut self, size: u32) -> Self {
        self.options.buffer_size = size;
        self
    }

    /// Set the segment ceiling (in bytes)
    pub fn segment_size(mut self, size: u32) -> Self {
        self.options.segment_size = size;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.options.sync_strategy = strategy;
        self
    }

    /// Set the directory permission bits
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.options.segment.dir_mode = mode;
        self
    }

    /// Set the file permission bits
    pub fn file_mode(mut self, mode: u32) -> Self {
        self.options.segment.file_mode = mode;
        self
    }

    /// Set the file open flags
    pub fn open_flags(mut self, flags: OpenFlags) -> Self {
        self.options.segment.open_flags = flags;
        self
    }

    pub fn build(self) -> WalOptions {
        self.options
    }
}
