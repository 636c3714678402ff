//! Content-type inference for uploads.
//!
//! Precedence is a hard contract: saved metadata beats magic-number sniffing
//! beats the filename extension, with `application/octet-stream` as the
//! final fallback.

use std::collections::HashMap;

pub const FALLBACK: &str = "application/octet-stream";

/// Best-guess MIME type for a document about to be uploaded.
pub fn resolve(
    metadata: Option<&HashMap<String, String>>,
    leading_bytes: &[u8],
    file_name: &str,
) -> String {
    if let Some(saved) = metadata.and_then(|m| m.get("Content-Type")) {
        if !saved.is_empty() {
            return saved.clone();
        }
    }
    if let Some(sniffed) = sniff(leading_bytes) {
        return sniffed.to_string();
    }
    new_mime_guess::from_path(file_name)
        .iter_raw()
        .next()
        .unwrap_or(FALLBACK)
        .to_string()
}

/// Magic-number lookup over the leading bytes of a file.
fn sniff(data: &[u8]) -> Option<&'static str> {
    match data {
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'%', b'P', b'D', b'F', b'-', ..] => Some("application/pdf"),
        [0x50, 0x4B, 0x03, 0x04, ..] => Some("application/zip"),
        [0x1F, 0x8B, ..] => Some("application/gzip"),
        [0x28, 0xB5, 0x2F, 0xFD, ..] => Some("application/zstd"),
        [b'I', b'D', b'3', ..] => Some("audio/mpeg"),
        [b'O', b'g', b'g', b'S', ..] => Some("audio/ogg"),
        [b'f', b'L', b'a', b'C', ..] => Some("audio/flac"),
        _ => None,
    }
}
