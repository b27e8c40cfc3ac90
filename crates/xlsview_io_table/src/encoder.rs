//! Whole-buffer charset conversion and byte-order marks.

use encoding_rs::{EncoderResult, Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};

use crate::conf::{TUP_BOM_UTF16BE, TUP_BOM_UTF16LE, TUP_BOM_UTF8};
use crate::spec::{RenderTableError, Result};

const N_LEN_ENCODE_CHUNK: usize = 8192;

/// Resolved output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    /// Any other WHATWG encoding with an encoder (Shift_JIS, windows-1252, ...).
    Legacy(&'static Encoding),
}

impl EnumTextEncoding {
    /// Canonical encoding name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => UTF_8.name(),
            Self::Utf16Le => UTF_16LE.name(),
            Self::Utf16Be => UTF_16BE.name(),
            Self::Legacy(encoding) => encoding.name(),
        }
    }

    /// Byte-order mark, when the encoding has one.
    pub fn bom(&self) -> Option<&'static [u8]> {
        match self {
            Self::Utf8 => Some(&TUP_BOM_UTF8),
            Self::Utf16Le => Some(&TUP_BOM_UTF16LE),
            Self::Utf16Be => Some(&TUP_BOM_UTF16BE),
            Self::Legacy(_) => None,
        }
    }
}

/// Resolve an encoding label (case-insensitive, WHATWG label set).
pub fn resolve_text_encoding(label: &str) -> Result<EnumTextEncoding> {
    let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) else {
        return Err(RenderTableError::UnsupportedEncoding {
            label: label.to_string(),
            reason: "unknown encoding label".to_string(),
        });
    };

    if encoding == REPLACEMENT {
        return Err(RenderTableError::UnsupportedEncoding {
            label: label.to_string(),
            reason: "label maps to the replacement encoding".to_string(),
        });
    }
    if encoding == UTF_8 {
        Ok(EnumTextEncoding::Utf8)
    } else if encoding == UTF_16LE {
        Ok(EnumTextEncoding::Utf16Le)
    } else if encoding == UTF_16BE {
        Ok(EnumTextEncoding::Utf16Be)
    } else {
        Ok(EnumTextEncoding::Legacy(encoding))
    }
}

/// Check that record text can be read under `data_encoding`.
///
/// Record text is always held as UTF-8, so only UTF-8 labels are accepted.
pub fn validate_data_encoding(data_encoding: &str) -> Result<()> {
    match resolve_text_encoding(data_encoding)? {
        EnumTextEncoding::Utf8 => Ok(()),
        other => Err(RenderTableError::UnsupportedEncoding {
            label: data_encoding.to_string(),
            reason: format!("record text is UTF-8 and cannot be read as {}", other.name()),
        }),
    }
}

/// Convert the complete buffer to `target_encoding`, optionally BOM-prefixed.
///
/// Targets without a byte-order mark are written without one. No partial
/// output is returned when a character cannot be represented.
pub fn encode_text(
    text: &str,
    data_encoding: &str,
    target_encoding: &str,
    if_bom: bool,
) -> Result<Vec<u8>> {
    validate_data_encoding(data_encoding)?;
    let encoding = resolve_text_encoding(target_encoding)?;

    let mut v_out: Vec<u8> = Vec::with_capacity(text.len() + 3);
    if if_bom && let Some(v_bom) = encoding.bom() {
        v_out.extend_from_slice(v_bom);
    }

    match encoding {
        EnumTextEncoding::Utf8 => v_out.extend_from_slice(text.as_bytes()),
        EnumTextEncoding::Utf16Le => {
            v_out.reserve(text.len() * 2);
            for n_unit in text.encode_utf16() {
                v_out.extend_from_slice(&n_unit.to_le_bytes());
            }
        }
        EnumTextEncoding::Utf16Be => {
            v_out.reserve(text.len() * 2);
            for n_unit in text.encode_utf16() {
                v_out.extend_from_slice(&n_unit.to_be_bytes());
            }
        }
        EnumTextEncoding::Legacy(legacy) => encode_legacy(text, legacy, &mut v_out)?,
    }

    Ok(v_out)
}

fn encode_legacy(text: &str, encoding: &'static Encoding, v_out: &mut Vec<u8>) -> Result<()> {
    let mut encoder = encoding.new_encoder();
    let mut v_chunk = vec![0u8; N_LEN_ENCODE_CHUNK];
    let mut c_rest = text;

    loop {
        let (result, n_read, n_written) =
            encoder.encode_from_utf8_without_replacement(c_rest, &mut v_chunk, true);
        v_out.extend_from_slice(&v_chunk[..n_written]);
        c_rest = &c_rest[n_read..];

        match result {
            EncoderResult::InputEmpty => return Ok(()),
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(ch) => {
                return Err(RenderTableError::Unmappable {
                    encoding: encoding.name().to_string(),
                    ch,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_labels() {
        assert_eq!(resolve_text_encoding("utf-8").unwrap(), EnumTextEncoding::Utf8);
        assert_eq!(resolve_text_encoding("UTF-16").unwrap(), EnumTextEncoding::Utf16Le);
        assert_eq!(resolve_text_encoding("utf-16be").unwrap(), EnumTextEncoding::Utf16Be);
        assert_eq!(resolve_text_encoding("SJIS").unwrap().name(), "Shift_JIS");
        assert!(matches!(
            resolve_text_encoding("klingon"),
            Err(RenderTableError::UnsupportedEncoding { .. })
        ));
        assert!(matches!(
            resolve_text_encoding("iso-2022-kr"),
            Err(RenderTableError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_encode_utf8_with_and_without_bom() {
        assert_eq!(encode_text("a,b", "UTF-8", "UTF-8", false).unwrap(), b"a,b");
        assert_eq!(
            encode_text("a", "UTF-8", "UTF-8", true).unwrap(),
            vec![0xEF, 0xBB, 0xBF, b'a']
        );
    }

    #[test]
    fn test_encode_utf16_variants() {
        assert_eq!(
            encode_text("a\n", "UTF-8", "UTF-16LE", true).unwrap(),
            vec![0xFF, 0xFE, 0x61, 0x00, 0x0A, 0x00]
        );
        assert_eq!(
            encode_text("a", "UTF-8", "UTF-16BE", true).unwrap(),
            vec![0xFE, 0xFF, 0x00, 0x61]
        );
    }

    #[test]
    fn test_encode_shift_jis() {
        let v_bytes = encode_text("あなた,と,私\n", "UTF-8", "SJIS", true).unwrap();
        assert_eq!(
            v_bytes,
            vec![
                0x82, 0xA0, 0x82, 0xC8, 0x82, 0xBD, b',', 0x82, 0xC6, b',', 0x8E, 0x84, b'\n'
            ]
        );
    }

    #[test]
    fn test_encode_unmappable_fails() {
        let result = encode_text("ok 😀", "UTF-8", "Shift_JIS", false);
        assert!(matches!(
            result,
            Err(RenderTableError::Unmappable { ch: '😀', .. })
        ));
    }

    #[test]
    fn test_data_encoding_must_be_utf8() {
        assert!(validate_data_encoding("utf8").is_ok());
        assert!(matches!(
            encode_text("a", "Shift_JIS", "UTF-8", false),
            Err(RenderTableError::UnsupportedEncoding { .. })
        ));
    }
}
