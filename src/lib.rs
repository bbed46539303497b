//! # walrog
//!
//! A segmented write-ahead log with:
//! - Fixed-layout binary records protected by CRC-32/IEEE
//! - Monotonically increasing Log Sequence Numbers (LSN)
//! - An in-memory write buffer with a hard size ceiling
//! - Size-bounded segment files with automatic rotation
//! - Fail-stop crash recovery
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Caller                              │
//! │               (single writer per Wal handle)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ append(payload)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │        Wal: Sequencer → Record codec → Buffer               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ flush / rotate
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │        Segment Store: wal_000.log, wal_001.log, ...         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ on restart
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │        WalRecovery: decode + verify → RecoveredEntry        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use walrog::{Wal, WalOptions};
//!
//! # fn main() -> walrog::Result<()> {
//! let options = WalOptions::builder().dir("/tmp/my_wal").build();
//! let (mut wal, replay) = Wal::recover(options)?;
//! for entry in replay {
//!     println!("lsn {} → {} bytes", entry.lsn, entry.payload.len());
//! }
//!
//! wal.append(b"set x = 1")?;
//! wal.flush()?;
//! wal.close().map_err(|(_, e)| e)?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{OpenFlags, SegmentOptions, WalOptions, WalSyncStrategy};
pub use error::{ErrorCategory, Result, WalError};
pub use wal::{Lsn, RecoveredEntry, SharedWal, Wal, WalRecovery};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of walrog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
