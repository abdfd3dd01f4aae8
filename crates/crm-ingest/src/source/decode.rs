//! Text decoding for source files of unknown encoding.
//!
//! Files are tried as UTF-8 first (with or without a byte-order mark). Bytes
//! that are not valid UTF-8 are decoded as Windows-1252, which maps every
//! byte, so decoding never fails.

use encoding_rs::WINDOWS_1252;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decoded file contents and the label of the encoding used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(rest) {
            return DecodedText {
                text: text.to_string(),
                encoding: "utf-8-sig",
            };
        }
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding: "utf-8",
        };
    }

    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    tracing::debug!("Source is not valid UTF-8, decoded as windows-1252");
    DecodedText {
        text: text.into_owned(),
        encoding: WINDOWS_1252.name(),
    }
}
