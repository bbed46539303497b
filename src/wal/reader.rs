//! WAL Reader
//!
//! Sequentially reads records from one segment, verifying each checksum.
//! The first decode error ends the stream: once framing is suspect nothing
//! after it can be located reliably.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, WalError};

use super::record::Record;

/// Reads verified records from a segment in file order
pub struct SegmentReader<R: Read> {
    reader: R,
    /// Byte offset of the next record
    offset: u64,
    /// Set once end-of-stream or an error was returned
    done: bool,
}

impl SegmentReader<BufReader<File>> {
    /// Open a segment file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| WalError::segment(path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> SegmentReader<R> {
    /// Wrap any sequential byte source positioned at a record boundary
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            done: false,
        }
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` once the stream ends cleanly at a record boundary.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        match Record::read_from(&mut self.reader, self.offset) {
            Ok(Some((record, consumed))) => {
                self.offset += consumed as u64;
                Ok(Some(record))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// Bytes consumed by the records read so far
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: Read> Iterator for SegmentReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
