//! Per-file normalization driver
//!
//! Ties the detector, validator, converter and repairer together into the
//! decision flow for one file, threaded through an explicit configuration
//! value rather than ambient state.

use std::io::SeekFrom;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

use crate::bom::{detect_signature, Signature};
use crate::channel::ByteChannel;
use crate::convert::{convert_file, SourceEncoding};
use crate::repair::repair;
use crate::validate::validate_to_fault;
use crate::{EncodingError, Result};

/// Configuration for per-file normalization.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeConfig {
    /// Legacy encoding assumed for non-UTF-8 content. Decoding under it is
    /// strict; undecodable bytes fail the file instead of being replaced.
    pub source: &'static Encoding,
    /// Write a UTF-8 BOM on rewritten files, and prepend one to valid
    /// UTF-8 files that lack it.
    pub add_bom: bool,
    /// Re-encode files whose encoding is not UTF-8 (legacy code pages and
    /// BOM-marked UTF-16/32).
    pub convert_non_utf8: bool,
    /// Repair UTF-8 files with embedded legacy-encoded spans.
    pub fix_mixed: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            source: WINDOWS_1252,
            add_bom: false,
            convert_non_utf8: true,
            fix_mixed: true,
        }
    }
}

/// What normalization did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Already canonical UTF-8; nothing written.
    AlreadyUtf8,
    /// Valid UTF-8 that only needed a BOM prepended.
    BomAdded,
    /// Whole file re-encoded from a BOM-identified Unicode form.
    ConvertedFromSignature(Signature),
    /// Whole file re-encoded from the configured legacy encoding.
    ConvertedFromLegacy(&'static str),
    /// Mixed UTF-8/legacy file surgically repaired.
    Repaired {
        /// Number of legacy spans converted.
        regions: usize,
    },
    /// The file needed work, but the relevant config flag is off.
    Skipped,
}

impl std::fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOutcome::AlreadyUtf8 => write!(f, "already UTF-8"),
            FileOutcome::BomAdded => write!(f, "BOM added"),
            FileOutcome::ConvertedFromSignature(sig) => write!(f, "converted from {sig}"),
            FileOutcome::ConvertedFromLegacy(name) => write!(f, "converted from {name}"),
            FileOutcome::Repaired { regions } => {
                write!(f, "repaired {regions} mixed-encoding region(s)")
            }
            FileOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Normalize one file to UTF-8 in place.
///
/// The channel is mutated in place; on success its final length exactly
/// matches the new content. Errors leave the file in whatever state the
/// last completed write reached; nothing is rolled back.
pub fn normalize_file<C: ByteChannel>(
    channel: &mut C,
    config: &NormalizeConfig,
) -> Result<FileOutcome> {
    channel.seek(SeekFrom::Start(0))?;
    let signature = detect_signature(channel)?;
    let total = channel.byte_len()?;

    match signature {
        Some(Signature::Utf8) | None => {
            normalize_utf8_or_unknown(channel, signature, total, config)
        }
        Some(sig @ Signature::Utf16Le) => {
            convert_signed(channel, sig, SourceEncoding::Labeled(UTF_16LE), config)
        }
        Some(sig @ Signature::Utf16Be) => {
            convert_signed(channel, sig, SourceEncoding::Labeled(UTF_16BE), config)
        }
        Some(sig @ Signature::Utf32Le) => {
            convert_signed(channel, sig, SourceEncoding::Utf32Le, config)
        }
        Some(Signature::Utf7) => Err(EncodingError::UnsupportedConversion(Signature::Utf7)),
    }
}

/// Handle the UTF-8-BOM and no-BOM cases: consistent, mixed, or legacy.
fn normalize_utf8_or_unknown<C: ByteChannel>(
    channel: &mut C,
    signature: Option<Signature>,
    total: u64,
    config: &NormalizeConfig,
) -> Result<FileOutcome> {
    let data_start = signature.map_or(0, Signature::bom_len);
    channel.seek(SeekFrom::Start(data_start))?;
    let outcome = validate_to_fault(channel, total - data_start)?;

    if outcome.is_valid {
        if config.add_bom && signature.is_none() {
            convert_file(channel, 0, SourceEncoding::Labeled(UTF_8), true)?;
            return Ok(FileOutcome::BomAdded);
        }
        return Ok(FileOutcome::AlreadyUtf8);
    }

    // A UTF-8 BOM, or any multi-byte sequence confirmed before the first
    // fault, marks the file as UTF-8 with pasted legacy spans. Otherwise
    // nothing in it ever decoded as UTF-8 and the whole file is legacy.
    let mixed = signature.is_some() || outcome.has_multibyte;
    if mixed {
        if !config.fix_mixed {
            return Ok(FileOutcome::Skipped);
        }
        channel.seek(SeekFrom::Start(data_start))?;
        let report = repair(channel, config.source)?;
        return Ok(FileOutcome::Repaired {
            regions: report.regions,
        });
    }

    if !config.convert_non_utf8 {
        return Ok(FileOutcome::Skipped);
    }
    convert_file(channel, 0, SourceEncoding::Labeled(config.source), config.add_bom)?;
    Ok(FileOutcome::ConvertedFromLegacy(config.source.name()))
}

/// Whole-file conversion for a BOM-identified Unicode form.
fn convert_signed<C: ByteChannel>(
    channel: &mut C,
    signature: Signature,
    source: SourceEncoding,
    config: &NormalizeConfig,
) -> Result<FileOutcome> {
    if !config.convert_non_utf8 {
        return Ok(FileOutcome::Skipped);
    }
    convert_file(channel, signature.bom_len(), source, config.add_bom)?;
    Ok(FileOutcome::ConvertedFromSignature(signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Seek, Write};

    fn run(bytes: &[u8], config: &NormalizeConfig) -> (Vec<u8>, FileOutcome) {
        let mut channel = Cursor::new(bytes.to_vec());
        let outcome = normalize_file(&mut channel, config).unwrap();
        (channel.into_inner(), outcome)
    }

    #[test]
    fn test_valid_utf8_is_untouched() {
        let (result, outcome) = run("héllo".as_bytes(), &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::AlreadyUtf8);
        assert_eq!(result, "héllo".as_bytes());
    }

    #[test]
    fn test_valid_utf8_with_bom_is_untouched() {
        let input = b"\xEF\xBB\xBFhello";
        let (result, outcome) = run(input, &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::AlreadyUtf8);
        assert_eq!(result, input);
    }

    #[test]
    fn test_empty_file_is_already_utf8() {
        let (result, outcome) = run(b"", &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::AlreadyUtf8);
        assert!(result.is_empty());
    }

    #[test]
    fn test_add_bom_to_valid_bomless_utf8() {
        let config = NormalizeConfig {
            add_bom: true,
            ..NormalizeConfig::default()
        };
        let (result, outcome) = run("héllo".as_bytes(), &config);
        assert_eq!(outcome, FileOutcome::BomAdded);
        let mut expected = b"\xEF\xBB\xBF".to_vec();
        expected.extend_from_slice("héllo".as_bytes());
        assert_eq!(result, expected);
    }

    #[test]
    fn test_bom_is_not_doubled() {
        let config = NormalizeConfig {
            add_bom: true,
            ..NormalizeConfig::default()
        };
        let input = b"\xEF\xBB\xBFhello";
        let (result, outcome) = run(input, &config);
        assert_eq!(outcome, FileOutcome::AlreadyUtf8);
        assert_eq!(result, input);
    }

    #[test]
    fn test_wholly_legacy_file_is_converted() {
        let (result, outcome) = run(b"caf\xE9 cr\xE8me", &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::ConvertedFromLegacy("windows-1252"));
        assert_eq!(result, "café crème".as_bytes());
    }

    #[test]
    fn test_mixed_file_with_bom_is_repaired() {
        let input = b"\xEF\xBB\xBFok \xC9\xED more text";
        let (result, outcome) = run(input, &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::Repaired { regions: 1 });
        let mut expected = b"\xEF\xBB\xBF".to_vec();
        expected.extend_from_slice("ok Éí more text".as_bytes());
        assert_eq!(result, expected);
    }

    #[test]
    fn test_mixed_bomless_file_with_confirmed_utf8_is_repaired() {
        // The valid é before the fault proves the file is UTF-8 at heart.
        let mut input = "héllo ".as_bytes().to_vec();
        input.extend_from_slice(b"\xC9\xED end");
        let (result, outcome) = run(&input, &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::Repaired { regions: 1 });
        assert_eq!(result, "héllo Éí end".as_bytes());
    }

    #[test]
    fn test_utf16_le_file_is_converted() {
        let input = b"\xFF\xFEh\x00i\x00";
        let (result, outcome) = run(input, &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::ConvertedFromSignature(Signature::Utf16Le));
        assert_eq!(result, b"hi");
    }

    #[test]
    fn test_utf16_be_file_is_converted() {
        let input = b"\xFE\xFF\x00h\x00i";
        let (result, outcome) = run(input, &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::ConvertedFromSignature(Signature::Utf16Be));
        assert_eq!(result, b"hi");
    }

    #[test]
    fn test_utf32_le_file_is_converted() {
        let input = b"\xFF\xFE\x00\x00A\x00\x00\x00";
        let (result, outcome) = run(input, &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::ConvertedFromSignature(Signature::Utf32Le));
        assert_eq!(result, b"A");
    }

    #[test]
    fn test_utf32_be_file_is_rejected_before_any_write() {
        let input = b"\x00\x00\xFE\xFF\x00\x00\x00A".to_vec();
        let mut channel = Cursor::new(input.clone());
        let err = normalize_file(&mut channel, &NormalizeConfig::default()).unwrap_err();
        assert!(matches!(err, EncodingError::UnsupportedSignature));
        assert_eq!(channel.into_inner(), input);
    }

    #[test]
    fn test_utf7_file_is_unsupported() {
        let mut channel = Cursor::new(b"\x2B\x2F\x76\x38text".to_vec());
        let err = normalize_file(&mut channel, &NormalizeConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::UnsupportedConversion(Signature::Utf7)
        ));
    }

    #[test]
    fn test_convert_flag_off_skips_legacy_files() {
        let config = NormalizeConfig {
            convert_non_utf8: false,
            ..NormalizeConfig::default()
        };
        let input = b"caf\xE9";
        let (result, outcome) = run(input, &config);
        assert_eq!(outcome, FileOutcome::Skipped);
        assert_eq!(result, input);
    }

    #[test]
    fn test_convert_flag_off_skips_utf16_files() {
        let config = NormalizeConfig {
            convert_non_utf8: false,
            ..NormalizeConfig::default()
        };
        let input = b"\xFF\xFEh\x00";
        let (result, outcome) = run(input, &config);
        assert_eq!(outcome, FileOutcome::Skipped);
        assert_eq!(result, input);
    }

    #[test]
    fn test_fix_mixed_flag_off_skips_repair() {
        let config = NormalizeConfig {
            fix_mixed: false,
            ..NormalizeConfig::default()
        };
        let input = b"\xEF\xBB\xBFok \xC9\xED more";
        let (result, outcome) = run(input, &config);
        assert_eq!(outcome, FileOutcome::Skipped);
        assert_eq!(result, input);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = b"\xEF\xBB\xBFok \xC9\xED more text";
        let (first, _) = run(input, &NormalizeConfig::default());
        let (second, outcome) = run(&first, &NormalizeConfig::default());
        assert_eq!(outcome, FileOutcome::AlreadyUtf8);
        assert_eq!(first, second);
    }

    #[test]
    fn test_undecodable_legacy_bytes_fail_the_file() {
        let config = NormalizeConfig {
            source: encoding_rs::SHIFT_JIS,
            ..NormalizeConfig::default()
        };
        // 0xA0 is not a valid Shift_JIS byte.
        let mut channel = Cursor::new(b"ab\xA0cd".to_vec());
        let err = normalize_file(&mut channel, &config).unwrap_err();
        assert!(matches!(err, EncodingError::UndecodableBytes { .. }));
    }

    #[test]
    fn test_normalize_real_file_on_disk() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"caf\xE9").unwrap();
        let outcome = normalize_file(&mut file, &NormalizeConfig::default()).unwrap();
        assert_eq!(outcome, FileOutcome::ConvertedFromLegacy("windows-1252"));

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut result = Vec::new();
        file.read_to_end(&mut result).unwrap();
        assert_eq!(result, "café".as_bytes());
    }

    #[test]
    fn test_repair_real_file_grows_in_place() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"\xEF\xBB\xBFok \xC9\xED more text").unwrap();
        let outcome = normalize_file(&mut file, &NormalizeConfig::default()).unwrap();
        assert_eq!(outcome, FileOutcome::Repaired { regions: 1 });

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut result = Vec::new();
        file.read_to_end(&mut result).unwrap();
        let mut expected = b"\xEF\xBB\xBF".to_vec();
        expected.extend_from_slice("ok Éí more text".as_bytes());
        assert_eq!(result, expected);
    }
}
