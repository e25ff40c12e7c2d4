//! Legacy-to-UTF-8 conversion
//!
//! Two shapes of conversion: a chunk converter that re-encodes an exact
//! byte range into an accumulating sink (used by the mixed-encoding
//! repairer), and a whole-file converter that decodes an entire channel
//! and rewrites it as UTF-8, truncating to the new length.
//!
//! Decoding is strict throughout: a byte sequence the source encoding
//! cannot represent is surfaced as [`EncodingError::UndecodableBytes`],
//! never silently substituted.

use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use encoding_rs::Encoding;

use crate::bom::UTF8_BOM;
use crate::channel::ByteChannel;
use crate::{EncodingError, Result};

/// A decodable source for whole-file conversion.
///
/// `encoding_rs` covers the single-byte code pages and UTF-16; UTF-32
/// little-endian gets a dedicated decoder because `encoding_rs` does not
/// carry it.
#[derive(Debug, Clone, Copy)]
pub enum SourceEncoding {
    /// Any encoding supported by `encoding_rs`.
    Labeled(&'static Encoding),
    /// UTF-32 little-endian.
    Utf32Le,
}

impl SourceEncoding {
    /// Name of the source encoding, for reporting.
    pub fn name(self) -> &'static str {
        match self {
            SourceEncoding::Labeled(encoding) => encoding.name(),
            SourceEncoding::Utf32Le => "UTF-32LE",
        }
    }

    /// Strictly decode `raw` to text. `offset` is the absolute position of
    /// `raw[0]` in the channel, used to report where decoding failed.
    fn decode(self, raw: &[u8], offset: u64) -> Result<String> {
        match self {
            SourceEncoding::Labeled(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(raw)
                .map(Cow::into_owned)
                .ok_or(EncodingError::UndecodableBytes {
                    encoding: encoding.name(),
                    offset,
                }),
            SourceEncoding::Utf32Le => decode_utf32_le(raw, offset),
        }
    }
}

/// Decode UTF-32 little-endian: one code point per 4-byte unit.
fn decode_utf32_le(raw: &[u8], offset: u64) -> Result<String> {
    let undecodable = |at: usize| EncodingError::UndecodableBytes {
        encoding: "UTF-32LE",
        offset: offset + at as u64,
    };

    if raw.len() % 4 != 0 {
        return Err(undecodable(raw.len() - raw.len() % 4));
    }

    let mut text = String::with_capacity(raw.len() / 4);
    for (i, unit) in raw.chunks_exact(4).enumerate() {
        let code_point = u32::from_le_bytes([unit[0], unit[1], unit[2], unit[3]]);
        let ch = char::from_u32(code_point).ok_or_else(|| undecodable(i * 4))?;
        text.push(ch);
    }
    Ok(text)
}

/// Decode the byte range `range` of `stream` under `source` and append its
/// UTF-8 re-encoding to `out`.
///
/// Consumes exactly the bytes in range: the stream cursor ends at
/// `range.end` with no read-ahead past it, so the next chunk starts
/// exactly at the declared boundary.
pub fn convert_chunk<S: Read + Seek>(
    stream: &mut S,
    range: Range<u64>,
    source: &'static Encoding,
    out: &mut Vec<u8>,
) -> Result<()> {
    stream.seek(SeekFrom::Start(range.start))?;
    let mut raw = vec![0u8; (range.end - range.start) as usize];
    stream.read_exact(&mut raw)?;

    let text = source
        .decode_without_bom_handling_and_without_replacement(&raw)
        .ok_or(EncodingError::UndecodableBytes {
            encoding: source.name(),
            offset: range.start,
        })?;
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

/// Decode everything from `data_start` (the first byte after any BOM) under
/// `source`, rewrite the channel from position 0 as UTF-8 (BOM-prefixed
/// when `add_bom`), and truncate to the write length.
///
/// Returns the new length; the channel's final byte length exactly matches
/// the newly written content, with no trailing leftovers from the previous,
/// possibly longer, encoding.
pub fn convert_file<C: ByteChannel>(
    channel: &mut C,
    data_start: u64,
    source: SourceEncoding,
    add_bom: bool,
) -> Result<u64> {
    let total = channel.byte_len()?;
    channel.seek(SeekFrom::Start(data_start))?;
    let mut raw = Vec::with_capacity((total - data_start) as usize);
    channel.read_to_end(&mut raw)?;
    let text = source.decode(&raw, data_start)?;

    channel.seek(SeekFrom::Start(0))?;
    let mut written = 0u64;
    if add_bom {
        channel.write_all(&UTF8_BOM)?;
        written += UTF8_BOM.len() as u64;
    }
    channel.write_all(text.as_bytes())?;
    written += text.len() as u64;
    channel.flush()?;
    channel.truncate(written)?;
    Ok(written)
}
