//! WAL Writer
//!
//! Buffers encoded records in memory and moves them to the hot segment.
//!
//! ## Write flow
//! 1. Encode the record with the next LSN. Larger than the buffer → reject.
//! 2. Fits in the buffer → buffer it, no I/O.
//! 3. Buffered bytes fit in the hot segment → flush, then buffer it.
//! 4. Otherwise → rotate to a new segment, flush, then buffer it.
//!
//! A flush is preferred over a rotation whenever the bytes already buffered
//! fit in the remaining segment capacity, even if the incoming record would
//! not. Appended records are durable only after the next flush.

use std::fmt;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::config::{WalOptions, WalSyncStrategy};
use crate::error::{Result, WalError};

use super::record;
use super::recovery::{RecoveredEntry, RecoveredSegment, WalRecovery};
use super::segment::{SegmentFile, SegmentInfo, SegmentStore};
use super::sequencer::Sequencer;
use super::Lsn;

/// What an append has to do before the new record can be buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WritePlan {
    /// Room left in the buffer
    Buffer,
    /// Flush the buffer into the hot segment first
    FlushThenBuffer,
    /// The hot segment cannot take the buffer: rotate, then flush
    RotateThenBuffer,
}

/// Decide how a record of `incoming` bytes enters the buffer
pub(crate) fn plan_write(
    buffered: usize,
    incoming: usize,
    buffer_size: u32,
    segment_size: u32,
    segment_used: u64,
) -> Result<WritePlan> {
    if incoming > buffer_size as usize {
        return Err(WalError::RecordTooLarge {
            size: incoming,
            limit: buffer_size,
        });
    }

    if !overflows(buffered, incoming, buffer_size) {
        return Ok(WritePlan::Buffer);
    }

    let remaining = (segment_size as u64).saturating_sub(segment_used);
    if buffered as u64 <= remaining {
        Ok(WritePlan::FlushThenBuffer)
    } else {
        Ok(WritePlan::RotateThenBuffer)
    }
}

/// Whether `incoming` more bytes would push the buffer past its ceiling
fn overflows(buffered: usize, incoming: usize, buffer_size: u32) -> bool {
    buffered + incoming > buffer_size as usize
}

/// The log handle
///
/// Owns the hot segment, the checkpoint file, the buffer and the sequencer.
/// There is no internal locking: a `Wal` has exactly one writer. Wrap it in
/// [`SharedWal`](super::SharedWal) to share it between threads.
///
/// Records still in the buffer when the handle is dropped are lost; call
/// [`Wal::close`] for an orderly shutdown.
pub struct Wal {
    options: WalOptions,
    store: SegmentStore,

    /// Segment currently receiving flushes
    hot: SegmentFile,

    /// Opaque to the log, owned for the consuming system
    checkpoint: File,

    /// Encoded records not yet written to the hot segment
    buffer: BytesMut,

    /// First and last LSN sitting in `buffer`
    pending: Option<(Lsn, Lsn)>,

    /// Bytes flushed into the hot segment
    segment_used: u64,

    sequencer: Sequencer,

    /// Segments no longer written to, oldest first
    sealed: Vec<SegmentInfo>,
}

impl Wal {
    /// Open a log in the configured directory
    ///
    /// Existing segments are verified first and the sequencer resumes after
    /// the last LSN found, so LSNs keep increasing across restarts. Writing
    /// always starts in a new segment.
    ///
    /// A corrupt existing segment makes the open fail, and that includes a
    /// record torn by a crash in the middle of a flush. Nothing is repaired
    /// automatically: every later `open` and `recover` keeps failing until
    /// the damaged segment is fixed or removed by hand. `walrog verify <dir>`
    /// names the segment and the offset of the first bad record.
    pub fn open(options: WalOptions) -> Result<Self> {
        options.validate()?;

        let sealed = WalRecovery::verify_dir(&options.segment.dir)?
            .into_iter()
            .map(|(info, _)| info)
            .collect();

        Self::open_with(options, sealed)
    }

    /// Open a log and return every entry already persisted, oldest first
    pub fn recover(options: WalOptions) -> Result<(Self, Vec<RecoveredEntry>)> {
        options.validate()?;

        let segments = WalRecovery::recover_dir(&options.segment.dir)?;
        let sealed = segments.iter().map(RecoveredSegment::info).collect();
        let entries = segments
            .into_iter()
            .flat_map(|segment| segment.entries)
            .collect();

        let wal = Self::open_with(options, sealed)?;
        Ok((wal, entries))
    }

    fn open_with(options: WalOptions, sealed: Vec<SegmentInfo>) -> Result<Self> {
        let sequencer = sealed
            .iter()
            .rev()
            .find_map(|segment| segment.last_lsn)
            .map(Sequencer::resume_after)
            .unwrap_or_default();

        let mut store = SegmentStore::new(options.segment.clone());
        let (hot, checkpoint) = store.open_log()?;

        info!(
            dir = %store.dir().display(),
            hot_segment = hot.id(),
            sealed = sealed.len(),
            next_lsn = sequencer.peek(),
            "WAL opened"
        );

        Ok(Self {
            buffer: BytesMut::with_capacity(options.buffer_size as usize),
            options,
            store,
            hot,
            checkpoint,
            pending: None,
            segment_used: 0,
            sequencer,
            sealed,
        })
    }

    /// Append a payload to the log
    ///
    /// Returns the LSN assigned to the record. The record is buffered, not
    /// yet durable. On error nothing is buffered and the LSN is not
    /// consumed.
    ///
    /// # Errors
    ///
    /// - `Encoding` if the payload length does not fit in 32 bits
    /// - `RecordTooLarge` if the encoded record exceeds the buffer size
    /// - `Flush` / `Segment` if making room required I/O that failed
    pub fn append(&mut self, payload: &[u8]) -> Result<Lsn> {
        let lsn = self.sequencer.peek();
        let encoded = record::encode(lsn, payload)?;

        let plan = plan_write(
            self.buffer.len(),
            encoded.len(),
            self.options.buffer_size,
            self.options.segment_size,
            self.segment_used,
        )?;

        match plan {
            WritePlan::Buffer => {}
            WritePlan::FlushThenBuffer => self.flush_to_hot()?,
            WritePlan::RotateThenBuffer => {
                self.rotate()?;
                self.flush_to_hot()?;
            }
        }

        self.buffer.extend_from_slice(&encoded);
        self.pending = Some(match self.pending {
            Some((first, _)) => (first, lsn),
            None => (lsn, lsn),
        });
        self.sequencer.next();

        Ok(lsn)
    }

    /// Force the buffer into the hot segment
    ///
    /// Rotates first if the buffered bytes no longer fit in the hot segment,
    /// so `segment_used` never exceeds the segment size. On failure the
    /// buffer is kept and the call can be retried.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        if self.buffer.len() as u64 > self.remaining_segment_capacity() {
            self.rotate()?;
        }
        self.flush_to_hot()
    }

    /// Replace the hot segment with a newly created one
    ///
    /// The old segment is synced and its handle released. Buffered records
    /// stay in the buffer and land in the new segment on the next flush.
    pub fn rotate(&mut self) -> Result<()> {
        if self.options.sync_strategy == WalSyncStrategy::EveryFlush {
            self.hot.sync()?;
        }

        let next = self.store.new_segment()?;
        let old = std::mem::replace(&mut self.hot, next).into_info();
        let used = std::mem::replace(&mut self.segment_used, 0);

        info!(
            sealed_segment = old.id,
            sealed_bytes = used,
            hot_segment = self.hot.id(),
            "rotated segment"
        );
        self.sealed.push(old);

        if self.options.sync_strategy == WalSyncStrategy::EveryFlush {
            self.store.sync_dir()?;
        }
        Ok(())
    }

    /// Discard the sealed segments holding only LSNs in `[lsn_first, lsn_last]`
    ///
    /// Segments are append-only files and are never rewritten: a segment
    /// partially covered by the range keeps all of its records, and the hot
    /// segment is never removed. Sealed segments without records are always
    /// removed. Returns the ids of the deleted segments.
    pub fn truncate(&mut self, lsn_first: Lsn, lsn_last: Lsn) -> Result<Vec<u64>> {
        if lsn_first > lsn_last {
            return Err(WalError::InvalidRange {
                first: lsn_first,
                last: lsn_last,
            });
        }

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.sealed.len());
        let mut failure = None;

        for segment in std::mem::take(&mut self.sealed) {
            if failure.is_none() && segment.within(lsn_first, lsn_last) {
                match self.store.remove_segment(&segment) {
                    Ok(()) => {
                        removed.push(segment.id);
                        continue;
                    }
                    Err(e) => failure = Some(e),
                }
            }
            kept.push(segment);
        }
        self.sealed = kept;

        if let Some(e) = failure {
            return Err(e);
        }

        if !removed.is_empty() {
            if self.options.sync_strategy == WalSyncStrategy::EveryFlush {
                self.store.sync_dir()?;
            }
            info!(first = lsn_first, last = lsn_last, removed = ?removed, "truncated WAL");
        }
        Ok(removed)
    }

    /// fsync the hot segment (buffered records are not flushed)
    pub fn sync(&self) -> Result<()> {
        self.hot.sync()
    }

    /// Flush, sync and release both file handles
    ///
    /// On failure the handle comes back with the error, buffer intact, so
    /// the close can be retried once the cause is fixed.
    pub fn close(mut self) -> std::result::Result<(), (Wal, WalError)> {
        if let Err(e) = self.flush() {
            return Err((self, e));
        }
        if let Err(e) = self.hot.sync() {
            return Err((self, e));
        }
        if let Err(e) = self.checkpoint.sync_all() {
            return Err((self, e.into()));
        }
        info!(hot_segment = self.hot.id(), next_lsn = self.next_lsn(), "WAL closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes flushed into the hot segment
    pub fn segment_used(&self) -> u64 {
        self.segment_used
    }

    /// LSN the next append will receive
    pub fn next_lsn(&self) -> Lsn {
        self.sequencer.peek()
    }

    /// The segment currently receiving flushes
    pub fn hot_segment(&self) -> &SegmentFile {
        &self.hot
    }

    /// Segments no longer written to, oldest first
    pub fn sealed_segments(&self) -> &[SegmentInfo] {
        &self.sealed
    }

    /// Handle of the checkpoint file
    pub fn checkpoint_file(&self) -> &File {
        &self.checkpoint
    }

    pub fn options(&self) -> &WalOptions {
        &self.options
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn remaining_segment_capacity(&self) -> u64 {
        (self.options.segment_size as u64).saturating_sub(self.segment_used)
    }

    /// Write the whole buffer to the hot segment without capacity checks
    fn flush_to_hot(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let buffered = self.buffer.len();

        if let Err(source) = self.hot.file_mut().write_all(&self.buffer) {
            self.rollback_partial_flush();
            return Err(WalError::Flush { buffered, source });
        }

        if self.options.sync_strategy == WalSyncStrategy::EveryFlush {
            if let Err(source) = self.hot.file().sync_data() {
                self.rollback_partial_flush();
                return Err(WalError::Flush { buffered, source });
            }
        }

        self.segment_used += buffered as u64;
        if let Some((first, last)) = self.pending.take() {
            self.hot.record_range(first, last);
        }
        self.buffer.clear();

        debug!(
            segment = self.hot.id(),
            bytes = buffered,
            segment_used = self.segment_used,
            "flushed buffer"
        );
        Ok(())
    }

    /// Cut the hot segment back to the last successful flush so a retried
    /// flush does not duplicate bytes
    fn rollback_partial_flush(&mut self) {
        let used = self.segment_used;
        let file = self.hot.file_mut();
        let result = file
            .set_len(used)
            .and_then(|_| file.seek(SeekFrom::Start(used)).map(|_| ()));

        match result {
            Ok(()) => warn!(segment = self.hot.id(), segment_used = used, "rolled back failed flush"),
            Err(e) => warn!(
                segment = self.hot.id(),
                error = %e,
                "could not roll back failed flush"
            ),
        }
    }
}

impl fmt::Debug for Wal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wal")
            .field("dir", &self.store.dir())
            .field("hot_segment", &self.hot.id())
            .field("buffered", &self.buffer.len())
            .field("segment_used", &self.segment_used)
            .field("next_lsn", &self.sequencer.peek())
            .field("sealed", &self.sealed.len())
            .finish()
    }
}
