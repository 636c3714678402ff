//! Backup a mock tree, restore the mirror, and compare the bytes on the
//! wire: every PUT body must equal the GET body the backup received.

mod common;

use std::collections::HashMap;

use adaptive_backup::digest::EtagAlgorithm;
use adaptive_backup::engine::{Engine, Mode};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn restore_uploads_exactly_what_backup_downloaded() {
    let source = MockServer::start().await;
    let text_body = b"hello world".to_vec();
    let binary_body: Vec<u8> = (0u8..=255).collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            serde_json::json!({
                "items": {
                    "hello.txt": {"ETag": "t1", "Content-Type": "text/plain", "Content-Length": 11},
                    "sub/": {"ETag": "f1"}
                }
            })
            .to_string()
            .into_bytes(),
            "application/json",
        ))
        .mount(&source)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            serde_json::json!({
                "items": {
                    "data.bin": {"ETag": "t2", "Content-Length": 256}
                }
            })
            .to_string()
            .into_bytes(),
            "application/json",
        ))
        .mount(&source)
        .await;
    Mock::given(method("GET"))
        .and(path("/hello.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(text_body.clone()))
        .mount(&source)
        .await;
    Mock::given(method("GET"))
        .and(path("/sub/data.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(binary_body.clone()))
        .mount(&source)
        .await;

    let workdir = TempDir::new().unwrap();
    let mirror = workdir.path().join("mirror");
    let backup = Engine::new(
        common::run_config(&source.uri(), mirror.clone()),
        Mode::Backup,
    )
    .unwrap();
    assert_eq!(backup.run().await.unwrap(), 0);
    assert!(backup.failed_paths().is_empty());

    let target = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"stored\""))
        .mount(&target)
        .await;

    let mut restore_config = common::run_config(&target.uri(), mirror);
    restore_config.etag_algorithm = Some(EtagAlgorithm::Md5);
    let restore = Engine::new(restore_config, Mode::Restore).unwrap();
    assert_eq!(restore.run().await.unwrap(), 0);
    assert!(restore.failed_paths().is_empty());

    let uploads: HashMap<String, Vec<u8>> = target
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.to_string() == "PUT")
        .map(|request| (request.url.path().to_string(), request.body.clone()))
        .collect();

    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads.get("/hello.txt").unwrap(), &text_body);
    assert_eq!(uploads.get("/sub/data.bin").unwrap(), &binary_body);
}
