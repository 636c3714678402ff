//! Restore walker: enqueue every document of a local mirror.
//!
//! The walk happens before any network work. Each directory's saved folder
//! description supplies per-document metadata; a missing or unreadable
//! description only costs the metadata, never the files.

use std::collections::HashMap;
use std::path::PathBuf;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::fs::FOLDER_DESCRIPTION_FILE;
use crate::utils::errors::BackupError;
use crate::utils::paths::local_path;
use crate::Result;

/// Walk the mirror and enqueue every document with its saved metadata.
///
/// With a category, `/category/` is listed first and `/public/category/`
/// second; a missing public mirror is ignored. Failure to open any other
/// seed root propagates.
pub async fn seed_restore_queue(engine: &Engine) -> Result<()> {
    let config = &engine.config;

    let mut seeds: Vec<(PathBuf, String, bool)> = Vec::new();
    match config.category.as_deref() {
        None => seeds.push((config.backup_dir.clone(), "/".to_string(), false)),
        Some(category) => {
            let prefix = format!("/{category}/");
            seeds.push((local_path(&config.backup_dir, &prefix), prefix, false));
            if config.include_public && category != "public" {
                let public_prefix = format!("/public/{category}/");
                seeds.push((
                    local_path(&config.backup_dir, &public_prefix),
                    public_prefix,
                    true,
                ));
            }
        }
    }

    for (dir, prefix, optional) in seeds {
        match walk_folder(engine, dir.clone(), prefix).await {
            Ok(()) => {}
            Err(BackupError::Io(err))
                if optional && err.kind() == std::io::ErrorKind::NotFound =>
            {
                info!("no public mirror at {}; skipping", dir.display());
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn walk_folder<'a>(engine: &'a Engine, dir: PathBuf, prefix: String) -> BoxFuture<'a, Result<()>> {
    async move {
        let saved = read_folder_description(&dir).await;

        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == FOLDER_DESCRIPTION_FILE || name.starts_with('.') {
                continue;
            }

            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!("skipping {}: {}", entry.path().display(), err);
                    continue;
                }
            };

            if file_type.is_file() {
                let metadata = saved.get(&name).cloned();
                if metadata.is_none() {
                    debug!("no saved metadata for {}{}", prefix, name);
                }
                engine.enqueue(format!("{prefix}{name}"), metadata);
            } else if file_type.is_dir() {
                let child_prefix = format!("{prefix}{name}/");
                if let Err(err) = walk_folder(engine, entry.path(), child_prefix).await {
                    warn!("skipping folder {}: {}", entry.path().display(), err);
                }
            }
            // symlinks, sockets and pipes are ignored
        }
        Ok(())
    }
    .boxed()
}

/// Per-document metadata from the folder description, keyed by child name.
async fn read_folder_description(dir: &std::path::Path) -> HashMap<String, HashMap<String, String>> {
    let path = dir.join(FOLDER_DESCRIPTION_FILE);
    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!("no folder description in {}: {}", dir.display(), err);
            return HashMap::new();
        }
    };

    let description: serde_json::Value = match serde_json::from_slice(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("folder description in {} is not valid JSON: {}", dir.display(), err);
            return HashMap::new();
        }
    };

    let mut saved = HashMap::new();
    if let Some(items) = description.get("items").and_then(serde_json::Value::as_object) {
        for (name, details) in items {
            let Some(fields) = details.as_object() else {
                continue;
            };
            let mut metadata = HashMap::new();
            for (key, value) in fields {
                match value {
                    serde_json::Value::String(text) => {
                        metadata.insert(key.clone(), text.clone());
                    }
                    serde_json::Value::Number(number) => {
                        metadata.insert(key.clone(), number.to_string());
                    }
                    serde_json::Value::Bool(flag) => {
                        metadata.insert(key.clone(), flag.to_string());
                    }
                    _ => {}
                }
            }
            saved.insert(name.clone(), metadata);
        }
    }
    saved
}
