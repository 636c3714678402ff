//! WebFinger discovery of the storage endpoint.
//!
//! Deliberately narrow: one lookup, no OAuth. Token acquisition is out of
//! scope, so a run without a token aborts before any transfer starts.

use serde_json::Value;

use crate::config;
use crate::utils::errors::BackupError;
use crate::Result;

const STORAGE_RELS: &[&str] = &[
    "http://tools.ietf.org/id/draft-dejong-remotestorage",
    "remotestorage",
    "remoteStorage",
];

/// Resolve a `user@host` address to the storage base endpoint.
pub async fn discover_endpoint(user_address: &str) -> Result<String> {
    let host = match user_address.split_once('@') {
        Some((user, host)) if !user.is_empty() && !host.is_empty() => host,
        _ => {
            return Err(BackupError::Discovery(format!(
                "'{user_address}' is not a user@host address"
            )))
        }
    };

    let url = format!("https://{host}/.well-known/webfinger?resource=acct:{user_address}");
    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(BackupError::Discovery(format!(
            "WebFinger lookup at {host} returned {}",
            response.status()
        )));
    }

    let body: Value = response.json().await?;
    let links = body
        .get("links")
        .and_then(Value::as_array)
        .ok_or_else(|| BackupError::Discovery("WebFinger response carries no links".into()))?;

    for link in links {
        let rel = link.get("rel").and_then(Value::as_str).unwrap_or_default();
        if STORAGE_RELS.contains(&rel) {
            if let Some(href) = link.get("href").and_then(Value::as_str) {
                return Ok(config::normalize_endpoint(href.to_string()));
            }
        }
    }

    Err(BackupError::Discovery(format!(
        "no storage endpoint advertised for {user_address}"
    )))
}
