//! Streaming UTF-8 validation
//!
//! A byte-level state machine that verifies a byte range as UTF-8 using a
//! running expected-continuation counter, optionally stopping at (and
//! localizing) the first invalid byte. Malformed UTF-8 is an expected,
//! reportable outcome here, never an error; only I/O failures return `Err`.

use std::io::{Read, Seek, SeekFrom};

use crate::Result;

const SCAN_BUF_SIZE: usize = 8 * 1024;

/// Outcome of scanning a byte range for UTF-8 validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    /// Whether the whole range is structurally valid UTF-8.
    pub is_valid: bool,
    /// Whether at least one multi-byte sequence completed before the scan
    /// ended or faulted. A truncated trailing sequence does not count.
    pub has_multibyte: bool,
    /// Absolute position of the first invalid byte, reported by
    /// [`validate_to_fault`]. For a truncated multi-byte sequence this is
    /// the position of its leading byte, not the truncation point.
    pub fault_start: Option<u64>,
}

/// Validate `len` bytes of `stream` from its current position.
///
/// The cursor is restored to the position held at entry, valid or not.
/// `fault_start` is never populated in this mode.
pub fn validate<S: Read + Seek>(stream: &mut S, len: u64) -> Result<Validation> {
    let origin = stream.stream_position()?;
    let outcome = scan(stream, len)?;
    stream.seek(SeekFrom::Start(origin))?;
    Ok(Validation {
        fault_start: None,
        ..outcome
    })
}

/// Validate `len` bytes of `stream`, stopping at the first invalid byte.
///
/// On a fault the cursor is left on the fault position so the caller can
/// resume exactly at the first bad byte; when the range is fully valid the
/// cursor is restored to the position held at entry.
pub fn validate_to_fault<S: Read + Seek>(stream: &mut S, len: u64) -> Result<Validation> {
    let origin = stream.stream_position()?;
    let outcome = scan(stream, len)?;
    match outcome.fault_start {
        Some(fault) => stream.seek(SeekFrom::Start(fault))?,
        None => stream.seek(SeekFrom::Start(origin))?,
    };
    Ok(outcome)
}

/// Shared scanning core for both validation modes.
///
/// Reads in buffered chunks and aborts at the first malformed byte; the
/// cursor is left wherever the last chunk read put it, and the public
/// wrappers re-synchronize it with an explicit seek.
fn scan<S: Read + Seek>(stream: &mut S, len: u64) -> Result<Validation> {
    let mut pos = stream.stream_position()?;
    let mut remaining = len;
    let mut buf = [0u8; SCAN_BUF_SIZE];

    // Continuation bytes still expected for the sequence in flight.
    let mut pending: u32 = 0;
    // Position of the current sequence's leading byte.
    let mut seq_start = pos;
    let mut has_multibyte = false;

    while remaining > 0 {
        let want = buf.len().min(remaining.min(usize::MAX as u64) as usize);
        let n = stream.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        remaining -= n as u64;

        for &byte in &buf[..n] {
            if pending > 0 {
                if byte & 0xC0 == 0x80 {
                    pending -= 1;
                    if pending == 0 {
                        has_multibyte = true;
                    }
                } else {
                    // Truncated sequence: the fault is its leading byte.
                    return Ok(fault_at(seq_start, has_multibyte));
                }
            } else if byte < 0x80 {
                // ASCII outside a sequence is always fine.
            } else if byte & 0xC0 == 0x80 {
                // Stray continuation byte.
                return Ok(fault_at(pos, has_multibyte));
            } else {
                // Leading byte: the run of 1-bits below the top bit gives
                // the number of continuation bytes to expect.
                let extra = (byte << 1).leading_ones();
                if extra > 3 {
                    return Ok(fault_at(pos, has_multibyte));
                }
                pending = extra;
                seq_start = pos;
            }
            pos += 1;
        }
    }

    if pending > 0 {
        // Range ended mid-sequence. A truncated trailing sequence is not a
        // confirmed multi-byte character, so the flag is reported false.
        return Ok(fault_at(seq_start, false));
    }

    Ok(Validation {
        is_valid: true,
        has_multibyte,
        fault_start: None,
    })
}

fn fault_at(position: u64, has_multibyte: bool) -> Validation {
    Validation {
        is_valid: false,
        has_multibyte,
        fault_start: Some(position),
    }
}
