//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Encode records with CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Buffer records and flush them into size-bounded segments
//! - Rotate to a new segment when the hot one is full
//! - Crash recovery and replay
//!
//! ## Record Format (little-endian, no padding)
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Record 1                                     │
//! │ ┌─────────┬─────────┬──────────────┬───────┐ │
//! │ │ LSN (4) │ Len (4) │ Payload (Len)│CRC (4)│ │
//! │ └─────────┴─────────┴──────────────┴───────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Record 2                                     │
//! │ ┌─────────┬─────────┬──────────────┬───────┐ │
//! │ │ LSN (4) │ Len (4) │ Payload (Len)│CRC (4)│ │
//! │ └─────────┴─────────┴──────────────┴───────┘ │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! CRC = CRC-32/IEEE over `LSN ‖ Len ‖ Payload`.

mod reader;
mod record;
mod recovery;
mod segment;
mod sequencer;
mod shared;
mod writer;

/// Log Sequence Number
pub type Lsn = u32;

pub use reader::SegmentReader;
pub use record::{
    compute_checksum, encode, encoded_len, Record, HEADER_SIZE, RECORD_OVERHEAD, TRAILER_SIZE,
};
pub use recovery::{RecoveredEntry, RecoveredSegment, SegmentSummary, WalRecovery};
pub use segment::{SegmentFile, SegmentInfo, SegmentStore, CHECKPOINT_FILENAME};
pub use sequencer::Sequencer;
pub use shared::SharedWal;
pub use writer::Wal;
