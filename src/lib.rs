//! # encnorm
//!
//! In-place text encoding normalization: convert files in a tree from
//! legacy single-byte encodings and byte-order-marked Unicode forms to
//! canonical UTF-8.
//!
//! ## Core components
//!
//! - [`bom`]: classify a Unicode signature from a stream's leading bytes,
//!   restoring the cursor.
//! - [`validate`]: a streaming byte-level UTF-8 checker that can localize
//!   the first invalid byte.
//! - [`convert`]: strict chunk and whole-file re-encoding to UTF-8.
//! - [`repair`]: surgical rewrite of mixed files, where valid UTF-8 content
//!   has isolated legacy-encoded byte spans pasted into it. Only the
//!   corrupted suffix is rewritten; everything before the first fault stays
//!   byte-identical on disk.
//! - [`normalize`]: the per-file decision flow tying the above together.
//!
//! ## Per-file flow
//!
//! BOM detection first determines a known encoding. A UTF-8 or BOM-less
//! file is checked by the validator: if internally consistent, nothing is
//! written; if it mixes UTF-8 and legacy spans, the repairer fixes only the
//! corrupted regions; a wholly legacy file is re-encoded in full. UTF-16
//! and UTF-32 LE files are re-encoded in full; UTF-32 BE is rejected.
//!
//! Everything is single-threaded blocking I/O over an exclusively owned
//! [`ByteChannel`], one file start-to-finish at a time.

pub mod bom;
pub mod channel;
pub mod convert;
pub mod normalize;
pub mod repair;
pub mod validate;

pub use bom::{detect_signature, Signature, UTF8_BOM};
pub use channel::ByteChannel;
pub use convert::{convert_chunk, convert_file, SourceEncoding};
pub use normalize::{normalize_file, FileOutcome, NormalizeConfig};
pub use repair::{repair, RepairReport};
pub use validate::{validate, validate_to_fault, Validation};

use thiserror::Error;

/// Errors raised by the core encoding operations.
///
/// Malformed UTF-8 found by the validator is a normal negative outcome,
/// not an error; only genuinely exceptional conditions appear here. The
/// per-file driver catches these, reports, and moves on to the next file.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The BOM bytes match UTF-32 big-endian, which is recognized but not
    /// supported. Raised before any write, so the file is never corrupted.
    #[error("UTF-32 big-endian is not supported")]
    UnsupportedSignature,

    /// A signature was detected but no converter exists for it.
    #[error("conversion from {0} is not supported")]
    UnsupportedConversion(Signature),

    /// The legacy decode step hit a byte sequence that is invalid under
    /// the declared source encoding. Chunks already flushed by an earlier
    /// stage of a multi-chunk repair are not rolled back.
    #[error("byte sequence at offset {offset} is not valid {encoding}")]
    UndecodableBytes {
        encoding: &'static str,
        offset: u64,
    },

    /// Underlying channel read/write/seek failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for encoding operations.
pub type Result<T> = std::result::Result<T, EncodingError>;
