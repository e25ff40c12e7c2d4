//! Mixed-encoding repair
//!
//! Handles a file that is known to be UTF-8 (by BOM or by configuration)
//! but fails whole-file validation: raw legacy-encoded bytes were pasted
//! into otherwise valid UTF-8 content. The repairer alternates between
//! copy-as-is spans (valid UTF-8) and convert spans (fault regions),
//! accumulating the reconstructed suffix in memory and writing it back
//! over the file in a single pass from the first fault position. Content
//! before the first fault is never touched on disk.

use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use encoding_rs::Encoding;

use crate::channel::ByteChannel;
use crate::convert::convert_chunk;
use crate::validate::validate_to_fault;
use crate::Result;

const COPY_BUF_SIZE: usize = 8 * 1024;

/// Summary of one repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairReport {
    /// Number of legacy spans converted.
    pub regions: usize,
    /// Position the rewrite started from, if anything was written.
    pub rewrite_from: Option<u64>,
    /// Length of the file after the pass. Repair never truncates, so this
    /// never shrinks below the original length.
    pub new_len: u64,
}

/// Repair the channel from its current position to end-of-file, converting
/// legacy-encoded fault regions under `source` and leaving valid UTF-8
/// spans byte-identical.
///
/// The caller positions the cursor just past any BOM. A fully valid file
/// is a no-write terminal success. A second pass over a repaired file
/// therefore changes nothing.
pub fn repair<C: ByteChannel>(channel: &mut C, source: &'static Encoding) -> Result<RepairReport> {
    let total = channel.byte_len()?;
    let origin = channel.stream_position()?;

    let outcome = validate_to_fault(channel, total - origin)?;
    let anchor = match outcome.fault_start {
        Some(position) => position,
        None => {
            return Ok(RepairReport {
                regions: 0,
                rewrite_from: None,
                new_len: total,
            })
        }
    };

    // Reconstructed content from the first fault onward.
    let mut buffer: Vec<u8> = Vec::new();
    let mut fault_start = anchor;
    let mut regions = 0usize;

    loop {
        // The longest run of high-bit bytes since the fault is treated as
        // one legacy chunk, so multi-byte legacy code points are never
        // fragmented across chunk boundaries.
        let fault_end = scan_fault_end(channel, fault_start)?;
        convert_chunk(channel, fault_start..fault_end, source, &mut buffer)?;
        regions += 1;

        if fault_end >= total {
            // End-of-file inside the fault region: the tail was the final chunk.
            break;
        }

        channel.seek(SeekFrom::Start(fault_end))?;
        let rest = validate_to_fault(channel, total - fault_end)?;
        match rest.fault_start {
            None => {
                // Remainder is fully valid: copy it verbatim and finish.
                copy_range(channel, fault_end..total, &mut buffer)?;
                break;
            }
            Some(next_fault) => {
                copy_range(channel, fault_end..next_fault, &mut buffer)?;
                fault_start = next_fault;
            }
        }
    }

    channel.seek(SeekFrom::Start(anchor))?;
    channel.write_all(&buffer)?;
    channel.flush()?;

    // Legacy bytes expand under UTF-8 and nothing is truncated here, so
    // the file length only grows.
    let new_len = (anchor + buffer.len() as u64).max(total);
    Ok(RepairReport {
        regions,
        rewrite_from: Some(anchor),
        new_len,
    })
}

/// Find the end of the fault region starting at `start`: the position of
/// the first byte with the high bit clear, or end-of-file.
fn scan_fault_end<S: Read + Seek>(stream: &mut S, start: u64) -> Result<u64> {
    stream.seek(SeekFrom::Start(start))?;
    let mut position = start;
    let mut buf = [0u8; COPY_BUF_SIZE];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Ok(position);
        }
        for &byte in &buf[..n] {
            if byte < 0x80 {
                return Ok(position);
            }
            position += 1;
        }
    }
}

/// Copy the byte range verbatim into the sink, without decoding.
fn copy_range<S: Read + Seek>(stream: &mut S, range: Range<u64>, out: &mut Vec<u8>) -> Result<()> {
    stream.seek(SeekFrom::Start(range.start))?;
    let mut remaining = range.end - range.start;
    let mut buf = [0u8; COPY_BUF_SIZE];
    while remaining > 0 {
        let want = buf.len().min(remaining.min(usize::MAX as u64) as usize);
        let n = stream.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
        remaining -= n as u64;
    }
    Ok(())
}
