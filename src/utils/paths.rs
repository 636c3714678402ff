//! Mapping between remote paths and URLs / local files.
//!
//! Remote paths are `/`-separated strings; a trailing `/` marks a folder.
//! Only this module is allowed to turn them into URL fragments, so paths
//! containing spaces, non-ASCII or reserved characters round-trip in exactly
//! one place.

use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside the RFC 3986 unreserved set gets percent-encoded.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Encode a remote path for appending to the base endpoint.
///
/// Each segment is percent-encoded on its own; `/` separators survive. The
/// leading `/` is dropped because the endpoint already ends with one.
pub fn encode_remote_path(path: &str) -> String {
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Where a remote path lives inside the local mirror.
pub fn local_path(root: &Path, remote_path: &str) -> PathBuf {
    let relative = remote_path.strip_prefix('/').unwrap_or(remote_path);
    root.join(relative)
}

/// Last segment of a document path, used for extension lookups.
pub fn document_name(remote_path: &str) -> &str {
    remote_path.rsplit('/').next().unwrap_or(remote_path)
}
