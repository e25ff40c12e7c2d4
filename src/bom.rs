//! Byte order mark detection
//!
//! Classifies a Unicode signature from up to the first 4 bytes of a stream,
//! by first byte with longest-prefix match:
//!
//! | Leading bytes   | Signature                         |
//! |-----------------|-----------------------------------|
//! | `EF BB BF`      | UTF-8                             |
//! | `FF FE 00 00`   | UTF-32 little-endian              |
//! | `FF FE`         | UTF-16 little-endian              |
//! | `FE FF`         | UTF-16 big-endian                 |
//! | `00 00 FE FF`   | UTF-32 big-endian (rejected)      |
//! | `2B 2F 76`      | UTF-7                             |
//!
//! Detection never moves the caller's cursor: the stream position is
//! restored before returning, so every later component can assume the
//! cursor still sits where it was before sniffing.

use std::io::{Read, Seek, SeekFrom};

use crate::{EncodingError, Result};

/// The UTF-8 byte order mark.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// A Unicode signature recognized from a stream's leading bytes.
///
/// UTF-32 big-endian is recognized but rejected: detection reports it as
/// [`EncodingError::UnsupportedSignature`] instead of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf7,
}

impl Signature {
    /// Length in bytes of this signature's byte order mark.
    pub fn bom_len(self) -> u64 {
        match self {
            Signature::Utf8 | Signature::Utf7 => 3,
            Signature::Utf16Le | Signature::Utf16Be => 2,
            Signature::Utf32Le => 4,
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Signature::Utf8 => "UTF-8",
            Signature::Utf16Le => "UTF-16LE",
            Signature::Utf16Be => "UTF-16BE",
            Signature::Utf32Le => "UTF-32LE",
            Signature::Utf7 => "UTF-7",
        };
        f.write_str(name)
    }
}

/// Detect a Unicode signature from up to the first 4 bytes of `stream`.
///
/// Reads at most 4 bytes and seeks back by exactly the number read, so the
/// call is side-effect-free for the caller's cursor. Returns `Ok(None)`
/// when no signature is present or fewer than 2 bytes are readable.
pub fn detect_signature<S: Read + Seek>(stream: &mut S) -> Result<Option<Signature>> {
    let mut buf = [0u8; 4];
    let mut read = 0;
    while read < buf.len() {
        let n = stream.read(&mut buf[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    stream.seek(SeekFrom::Current(-(read as i64)))?;

    if read < 2 {
        return Ok(None);
    }

    let signature = match buf[0] {
        0xEF if read > 2 && buf[1] == 0xBB && buf[2] == 0xBF => Some(Signature::Utf8),
        0xFF if buf[1] == 0xFE => {
            if read > 3 && buf[2] == 0x00 && buf[3] == 0x00 {
                Some(Signature::Utf32Le)
            } else {
                Some(Signature::Utf16Le)
            }
        }
        0xFE if buf[1] == 0xFF => Some(Signature::Utf16Be),
        0x00 if read > 3 && buf[1] == 0x00 && buf[2] == 0xFE && buf[3] == 0xFF => {
            return Err(EncodingError::UnsupportedSignature);
        }
        0x2B if read > 2 && buf[1] == 0x2F && buf[2] == 0x76 => Some(Signature::Utf7),
        _ => None,
    };

    Ok(signature)
}
