//! Backup-side transfer: fetch one remote path into the local mirror.
//!
//! Folder responses persist the server body verbatim and expand their
//! children into the queue; document responses stream straight to disk.

use futures_util::StreamExt;
use reqwest::header::RETRY_AFTER;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::engine::Engine;
use crate::fs::FOLDER_DESCRIPTION_FILE;
use crate::transfer::progress::format_bytes;
use crate::transfer::{header_string, Disposition};
use crate::utils::paths::{encode_remote_path, local_path};

pub async fn transfer(engine: &Engine, path: &str) -> Disposition {
    let url = format!("{}{}", engine.config.endpoint, encode_remote_path(path));
    let response = match engine.client.get(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            warn!("GET {} failed: {}", path, err);
            return Disposition::RetryCounted;
        }
    };

    let status = response.status().as_u16();
    match status {
        200 if path.ends_with('/') => store_folder(engine, path, response).await,
        200 => store_document(engine, path, response).await,
        401 | 403 => {
            error!("no permission to read {} (status {})", path, status);
            Disposition::PermanentFailure
        }
        404 | 410 => {
            warn!("{} disappeared since the walk started (status {})", path, status);
            Disposition::PermanentFailure
        }
        429 | 503 => {
            warn!("server overloaded while fetching {} (status {})", path, status);
            Disposition::Overloaded {
                retry_after: header_string(&response, RETRY_AFTER),
            }
        }
        504 => {
            warn!("gateway timeout fetching {}; will retry", path);
            Disposition::RetryWithoutCount
        }
        _ => {
            warn!("GET {} returned {}; will retry", path, status);
            Disposition::RetryCounted
        }
    }
}

/// Persist the folder body byte-for-byte and enqueue every child. Documents
/// are child keys without a trailing `/`, subfolders end with one; either
/// way the queued path is the folder path plus the key.
async fn store_folder(engine: &Engine, path: &str, response: reqwest::Response) -> Disposition {
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(err) => {
            warn!("reading folder body for {} failed: {}", path, err);
            return Disposition::RetryCounted;
        }
    };

    let description: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!("folder description for {} is not valid JSON: {}", path, err);
            return Disposition::RetryCounted;
        }
    };

    let dir = local_path(&engine.config.backup_dir, path);
    let persisted = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(FOLDER_DESCRIPTION_FILE), &body).await
    };
    if let Err(err) = persisted.await {
        warn!("cannot persist folder description for {}: {}", path, err);
        return Disposition::RetryCounted;
    }

    match description.get("items").and_then(serde_json::Value::as_object) {
        Some(items) => {
            for name in items.keys() {
                if valid_child_name(name) {
                    engine.enqueue(format!("{path}{name}"), None);
                } else {
                    warn!("ignoring suspicious child name {:?} under {}", name, path);
                }
            }
        }
        None => warn!("folder description for {} carries no items map", path),
    }

    Disposition::Complete
}

async fn store_document(engine: &Engine, path: &str, response: reqwest::Response) -> Disposition {
    let file_path = local_path(&engine.config.backup_dir, path);
    let stored = async {
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&file_path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(std::io::Error::other)?;
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }
        file.flush().await?;
        Ok::<u64, std::io::Error>(written)
    };

    match stored.await {
        Ok(written) => {
            engine.stats.add_document(written);
            debug!("downloaded {} ({})", path, format_bytes(written));
            Disposition::Complete
        }
        Err(err) => {
            warn!("failed to store {}: {}", path, err);
            Disposition::RetryCounted
        }
    }
}

/// Child keys come straight from the server; anything that could escape the
/// mirror directory is dropped.
fn valid_child_name(name: &str) -> bool {
    let stem = name.strip_suffix('/').unwrap_or(name);
    !(stem.is_empty() || stem == "." || stem == ".." || stem.contains('/') || stem.contains('\0'))
}
