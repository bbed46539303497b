//! Segment Store
//!
//! Creates and opens the numbered segment files and the checkpoint file.
//!
//! ## Responsibilities
//! - Create the log directory with the configured permissions
//! - Discover existing segments on startup
//! - Hand out `wal_NNN.log` files in strictly increasing order
//! - Remove segments released by truncation
//!
//! The file counter belongs to one store instance. On open it resumes after
//! the highest segment already on disk, so an existing segment is never
//! reopened for writing.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::SegmentOptions;
use crate::error::{Result, WalError};

use super::Lsn;

/// Name of the checkpoint file inside the log directory
pub const CHECKPOINT_FILENAME: &str = "checkpoint";

const SEGMENT_PREFIX: &str = "wal_";
const SEGMENT_EXTENSION: &str = "log";

/// Metadata for a segment that is no longer (or not yet) the hot file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Segment number (`wal_NNN.log`)
    pub id: u64,
    /// Full path of the segment file
    pub path: PathBuf,
    /// First LSN stored in the segment, `None` if it holds no records
    pub first_lsn: Option<Lsn>,
    /// Last LSN stored in the segment
    pub last_lsn: Option<Lsn>,
}

impl SegmentInfo {
    /// Whether no record was ever flushed into this segment
    pub fn is_empty(&self) -> bool {
        self.first_lsn.is_none()
    }

    /// Whether every record of the segment lies in `[first, last]`
    ///
    /// Empty segments hold nothing worth keeping and always qualify.
    pub fn within(&self, first: Lsn, last: Lsn) -> bool {
        match (self.first_lsn, self.last_lsn) {
            (Some(lo), Some(hi)) => lo >= first && hi <= last,
            _ => true,
        }
    }
}

/// An open segment file together with the LSN range flushed into it
#[derive(Debug)]
pub struct SegmentFile {
    id: u64,
    path: PathBuf,
    file: File,
    first_lsn: Option<Lsn>,
    last_lsn: Option<Lsn>,
}

impl SegmentFile {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying file handle
    pub fn file(&self) -> &File {
        &self.file
    }

    pub(crate) fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Remember that records `first..=last` now live in this segment
    pub(crate) fn record_range(&mut self, first: Lsn, last: Lsn) {
        if self.first_lsn.is_none() {
            self.first_lsn = Some(first);
        }
        self.last_lsn = Some(last);
    }

    /// fsync the segment's data
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_data()
            .map_err(|e| WalError::segment(&self.path, e))
    }

    /// Snapshot of the segment metadata
    pub fn info(&self) -> SegmentInfo {
        SegmentInfo {
            id: self.id,
            path: self.path.clone(),
            first_lsn: self.first_lsn,
            last_lsn: self.last_lsn,
        }
    }

    /// Release the handle, keeping only the metadata
    pub(crate) fn into_info(self) -> SegmentInfo {
        SegmentInfo {
            id: self.id,
            path: self.path,
            first_lsn: self.first_lsn,
            last_lsn: self.last_lsn,
        }
    }
}

/// Creates numbered segment files in one directory
#[derive(Debug)]
pub struct SegmentStore {
    options: SegmentOptions,
    next_id: u64,
}

impl SegmentStore {
    pub fn new(options: SegmentOptions) -> Self {
        Self { options, next_id: 0 }
    }

    /// Prepare the directory and open the first hot segment and checkpoint
    ///
    /// On startup:
    /// 1. Create the directory if it doesn't exist
    /// 2. Discover existing segments and resume numbering after them
    /// 3. Create the next segment file
    /// 4. Open (or create) the checkpoint file
    pub fn open_log(&mut self) -> Result<(SegmentFile, File)> {
        self.create_dir()?;

        let existing = Self::list_segments(&self.options.dir)?;
        if let Some((last_id, _)) = existing.last() {
            self.next_id = self.next_id.max(last_id + 1);
        }
        debug!(
            dir = %self.options.dir.display(),
            existing = existing.len(),
            next_id = self.next_id,
            "opening log directory"
        );

        let hot = self.new_segment()?;
        let checkpoint = self.open_checkpoint()?;
        Ok((hot, checkpoint))
    }

    /// Create and open the next numbered segment file
    pub fn new_segment(&mut self) -> Result<SegmentFile> {
        let id = self.next_id;
        let path = Self::segment_path(&self.options.dir, id);

        let file = self
            .options
            .open_flags
            .to_open_options(self.options.file_mode)
            .open(&path)
            .map_err(|e| WalError::segment(&path, e))?;

        self.next_id += 1;
        info!(segment = id, path = %path.display(), "created segment");

        Ok(SegmentFile {
            id,
            path,
            file,
            first_lsn: None,
            last_lsn: None,
        })
    }

    /// Open the checkpoint file; its contents are opaque to the log
    pub fn open_checkpoint(&self) -> Result<File> {
        let path = self.options.dir.join(CHECKPOINT_FILENAME);
        self.options
            .open_flags
            .to_open_options(self.options.file_mode)
            .open(&path)
            .map_err(|e| WalError::segment(&path, e))
    }

    /// Delete a sealed segment file
    pub fn remove_segment(&self, segment: &SegmentInfo) -> Result<()> {
        match fs::remove_file(&segment.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WalError::segment(&segment.path, e)),
        }
    }

    /// fsync the directory so newly created or removed entries are durable
    pub fn sync_dir(&self) -> Result<()> {
        #[cfg(unix)]
        {
            let dir = File::open(&self.options.dir)
                .map_err(|e| WalError::segment(&self.options.dir, e))?;
            dir.sync_all()
                .map_err(|e| WalError::segment(&self.options.dir, e))?;
        }
        Ok(())
    }

    /// Directory holding the segments
    pub fn dir(&self) -> &Path {
        &self.options.dir
    }

    /// Id the next created segment will get
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Existing segments in `dir`, ordered by id ascending
    ///
    /// A missing directory simply holds no segments.
    pub fn list_segments(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WalError::segment(dir, e)),
        };

        let mut segments = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(id) = Self::parse_segment_id(&path) {
                segments.push((id, path));
            }
        }

        segments.sort_by_key(|(id, _)| *id);
        Ok(segments)
    }

    /// Generate the segment path for a directory and id
    pub fn segment_path(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("{}{:03}.{}", SEGMENT_PREFIX, id, SEGMENT_EXTENSION))
    }

    /// Parse the segment id from a filename
    /// "wal_042.log" → Some(42)
    pub fn parse_segment_id(path: &Path) -> Option<u64> {
        if path.extension()? != SEGMENT_EXTENSION {
            return None;
        }
        let name = path.file_stem()?.to_str()?;
        let digits = name.strip_prefix(SEGMENT_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    fn create_dir(&self) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.options.dir_mode);
        }

        builder
            .create(&self.options.dir)
            .map_err(|e| WalError::segment(&self.options.dir, e))
    }
}
