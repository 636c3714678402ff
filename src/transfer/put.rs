//! Restore-side transfer: upload one local document as a conditional PUT.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::Ordering;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH, RETRY_AFTER};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use crate::content_type;
use crate::digest;
use crate::engine::Engine;
use crate::transfer::progress_stream::ProgressStream;
use crate::transfer::{header_string, Disposition};
use crate::utils::paths::{document_name, encode_remote_path, local_path};

/// How much of the file is read for magic-number sniffing.
const SNIFF_LEN: usize = 512;

/// What a PUT produced, for the caller and for tests.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub status: u16,
    pub etag: Option<String>,
    pub content_type: String,
    pub content_length: u64,
}

/// Upload the document at `path`. The disposition tells the engine what to
/// do with the queue entry; the outcome carries the response details when a
/// response was received.
pub async fn transfer(
    engine: &Engine,
    path: &str,
    metadata: Option<&HashMap<String, String>>,
) -> (Disposition, Option<PutOutcome>) {
    let file_path = local_path(&engine.config.backup_dir, path);
    let upload = match prepare_upload(engine, &file_path, path, metadata).await {
        Ok(upload) => upload,
        Err(err) => {
            error!("cannot read local file {}: {}", file_path.display(), err);
            return (Disposition::Fatal, None);
        }
    };

    let url = format!("{}{}", engine.config.endpoint, encode_remote_path(path));
    let (body_stream, sent) = ProgressStream::new(ReaderStream::new(upload.file));
    let mut request = engine
        .client
        .put(&url)
        .header(CONTENT_TYPE, &upload.content_type)
        .header(CONTENT_LENGTH, upload.content_length);
    if let Some(etag) = &upload.file_etag {
        request = request.header(IF_NONE_MATCH, etag);
    }

    let response = match request
        .body(reqwest::Body::wrap_stream(body_stream))
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(
                "PUT {} failed after {} bytes: {}",
                path,
                sent.load(Ordering::Relaxed),
                err
            );
            return (Disposition::RetryCounted, None);
        }
    };

    let status = response.status().as_u16();
    let server_etag = header_string(&response, ETAG);
    let outcome = |etag: Option<String>| {
        Some(PutOutcome {
            status,
            etag,
            content_type: upload.content_type.clone(),
            content_length: upload.content_length,
        })
    };

    match status {
        200 => {
            info!("updated {}", path);
            engine.stats.add_document(upload.content_length);
            (Disposition::Complete, outcome(server_etag))
        }
        201 => {
            info!("created {}", path);
            engine.stats.add_document(upload.content_length);
            (Disposition::Complete, outcome(server_etag))
        }
        412 => {
            // The server already holds this exact version; nothing was sent.
            info!("{} is already current", path);
            (Disposition::Complete, outcome(upload.file_etag.clone()))
        }
        401 | 403 => {
            error!("no permission to write {} (status {})", path, status);
            (Disposition::PermanentFailure, outcome(server_etag))
        }
        429 | 503 => {
            warn!("server overloaded while uploading {} (status {})", path, status);
            (
                Disposition::Overloaded {
                    retry_after: header_string(&response, RETRY_AFTER),
                },
                outcome(server_etag),
            )
        }
        504 => {
            warn!("gateway timeout uploading {}; will retry", path);
            (Disposition::RetryWithoutCount, outcome(server_etag))
        }
        _ => {
            warn!("PUT {} returned {}; will retry", path, status);
            (Disposition::RetryCounted, outcome(server_etag))
        }
    }
}

struct PreparedUpload {
    file: tokio::fs::File,
    content_type: String,
    content_length: u64,
    file_etag: Option<String>,
}

/// Work out headers and open a fresh handle for the body. The digest pass
/// streams the file separately so nothing is buffered in memory.
async fn prepare_upload(
    engine: &Engine,
    file_path: &Path,
    remote_path: &str,
    metadata: Option<&HashMap<String, String>>,
) -> std::io::Result<PreparedUpload> {
    let file_meta = tokio::fs::metadata(file_path).await?;
    let content_length = file_meta.len();

    let mut head = [0u8; SNIFF_LEN];
    let head_len = {
        let mut file = tokio::fs::File::open(file_path).await?;
        read_head(&mut file, &mut head).await?
    };
    let content_type = content_type::resolve(metadata, &head[..head_len], document_name(remote_path));

    let file_etag = match engine.config.etag_algorithm {
        Some(algorithm) => Some(digest::file_etag(file_path, algorithm).await?),
        None => metadata.and_then(|saved| saved.get("ETag")).cloned(),
    };

    let file = tokio::fs::File::open(file_path).await?;
    Ok(PreparedUpload {
        file,
        content_type,
        content_length,
        file_etag,
    })
}

async fn read_head(file: &mut tokio::fs::File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
