//! WAL Record codec
//!
//! Encodes and decodes the fixed-layout binary record:
//!
//! ```text
//! [lsn: u32 LE][length: u32 LE][payload: length bytes][crc: u32 LE]
//! ```
//!
//! The CRC is CRC-32/IEEE over `lsn ‖ length ‖ payload`, never over itself.

use std::io::{self, Read};

use bytes::Bytes;
use crc32fast::Hasher;

use crate::error::{Result, WalError};

use super::Lsn;

/// Header size: LSN (4) + Length (4) = 8 bytes
pub const HEADER_SIZE: usize = 8;

/// Trailer size: CRC (4)
pub const TRAILER_SIZE: usize = 4;

/// Fixed bytes added around every payload
pub const RECORD_OVERHEAD: usize = HEADER_SIZE + TRAILER_SIZE;

/// A single verified record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Log Sequence Number assigned by the writer
    pub lsn: Lsn,

    /// Caller-supplied bytes, opaque to the log
    pub payload: Bytes,
}

/// Size of a record on disk for a payload of `payload_len` bytes
pub fn encoded_len(payload_len: usize) -> usize {
    RECORD_OVERHEAD + payload_len
}

/// CRC-32/IEEE over the header bytes followed by the payload
pub fn compute_checksum(header: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(header);
    hasher.update(payload);
    hasher.finalize()
}

/// Encode one record into its on-disk byte layout
///
/// Fails with [`WalError::Encoding`] if the payload length does not fit in
/// the 32-bit length field.
pub fn encode(lsn: Lsn, payload: &[u8]) -> Result<Vec<u8>> {
    let length = u32::try_from(payload.len()).map_err(|_| WalError::Encoding {
        len: payload.len(),
    })?;

    let mut buf = Vec::with_capacity(encoded_len(payload.len()));
    buf.extend_from_slice(&lsn.to_le_bytes());
    buf.extend_from_slice(&length.to_le_bytes());
    buf.extend_from_slice(payload);

    let crc = compute_checksum(&buf[..HEADER_SIZE], payload);
    buf.extend_from_slice(&crc.to_le_bytes());

    Ok(buf)
}

impl Record {
    pub fn new(lsn: Lsn, payload: impl Into<Bytes>) -> Self {
        Self {
            lsn,
            payload: payload.into(),
        }
    }

    /// Encode this record (see [`encode`])
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self.lsn, &self.payload)
    }

    /// Size of this record on disk
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.payload.len())
    }

    /// Decode the first record of `bytes`
    ///
    /// Returns the record and the number of bytes it occupied. An empty slice
    /// is a truncated record, not a clean end.
    pub fn decode(bytes: &[u8]) -> Result<(Record, usize)> {
        let mut cursor = bytes;
        match Self::read_from(&mut cursor, 0)? {
            Some(decoded) => Ok(decoded),
            None => Err(WalError::TruncatedRecord {
                offset: 0,
                expected: HEADER_SIZE as u64,
                found: 0,
            }),
        }
    }

    /// Read the next record from a sequential byte source
    ///
    /// `offset` is the stream position of the record, used only for error
    /// context.
    ///
    /// Returns:
    /// - `Ok(Some((record, consumed)))`: a complete, verified record
    /// - `Ok(None)`: the stream ended exactly at a record boundary
    /// - `Err(TruncatedRecord)`: the stream ended inside a record
    /// - `Err(ChecksumMismatch)`: the stored CRC does not match
    pub fn read_from<R: Read>(reader: &mut R, offset: u64) -> Result<Option<(Record, usize)>> {
        let mut header = [0u8; HEADER_SIZE];
        let got = read_full(reader, &mut header)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_SIZE {
            return Err(WalError::TruncatedRecord {
                offset,
                expected: HEADER_SIZE as u64,
                found: got as u64,
            });
        }

        let lsn = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as u64;
        let expected = RECORD_OVERHEAD as u64 + length;

        // Grow incrementally so a garbage length cannot force a huge allocation
        let mut payload = Vec::new();
        reader.by_ref().take(length).read_to_end(&mut payload)?;
        if (payload.len() as u64) < length {
            return Err(WalError::TruncatedRecord {
                offset,
                expected,
                found: (HEADER_SIZE + payload.len()) as u64,
            });
        }

        let mut trailer = [0u8; TRAILER_SIZE];
        let got = read_full(reader, &mut trailer)?;
        if got < TRAILER_SIZE {
            return Err(WalError::TruncatedRecord {
                offset,
                expected,
                found: HEADER_SIZE as u64 + length + got as u64,
            });
        }

        let stored = u32::from_le_bytes(trailer);
        let computed = compute_checksum(&header, &payload);
        if stored != computed {
            return Err(WalError::ChecksumMismatch {
                offset,
                lsn,
                stored,
                computed,
            });
        }

        let consumed = RECORD_OVERHEAD + payload.len();
        let record = Record {
            lsn,
            payload: Bytes::from(payload),
        };
        Ok(Some((record, consumed)))
    }
}

/// Fill `buf` as far as the reader allows, returning the bytes read.
/// Stops early only at end-of-stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
