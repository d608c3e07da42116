// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Event-loop integration tests against an in-memory object store.

use async_trait::async_trait;
use lfs3_agent::agent;
use lfs3_agent::cache::CacheLayout;
use lfs3_agent::store::{ObjectReader, ObjectStore, RemoteObject};
use lfs3_agent::AgentContext;
use lfs3_common::utils::digest::sha256_bytes;
use lfs3_common::{AgentError, AgentResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::BufReader;

#[derive(Clone)]
struct StoredObject {
    data: Vec<u8>,
    digest: Option<String>,
}

#[derive(Default)]
struct MemStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    head_calls: AtomicUsize,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    copy_calls: AtomicUsize,
}

impl MemStore {
    fn insert(&self, key: &str, data: &[u8], digest: Option<&str>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                digest: digest.map(|d| d.to_string()),
            },
        );
    }

    fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn copy_calls(&self) -> usize {
        self.copy_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemStore {
    async fn head(&self, key: &str) -> AgentResult<Option<RemoteObject>> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.object(key).map(|o| RemoteObject {
            size: o.data.len() as i64,
            digest: o.digest,
        }))
    }

    async fn get(&self, key: &str) -> AgentResult<ObjectReader> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        match self.object(key) {
            Some(o) => {
                let reader: ObjectReader = Box::pin(Cursor::new(o.data));
                Ok(reader)
            }
            None => Err(AgentError::store_read(format!("no such object: {}", key))),
        }
    }

    async fn put(&self, key: &str, source: &Path, digest: &str) -> AgentResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(source)
            .await
            .map_err(|e| AgentError::local_file(source, e))?;
        self.insert(key, &data, Some(digest));
        Ok(())
    }

    async fn backfill_digest(&self, key: &str, digest: &str) -> AgentResult<()> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().unwrap();
        match objects.get_mut(key) {
            Some(o) => {
                o.digest = Some(digest.to_string());
                Ok(())
            }
            None => Err(AgentError::store_write(format!("no such object: {}", key))),
        }
    }
}

struct Fixture {
    dir: TempDir,
    store: Arc<MemStore>,
    ctx: AgentContext,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemStore::default());
        let ctx = AgentContext::new(
            store.clone(),
            CacheLayout::new(dir.path().join("cache"), 16),
            "alice".to_string(),
        );
        Self { dir, store, ctx }
    }

    fn write_source(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn cache_path(&self, oid: &str, name: &str) -> PathBuf {
        self.ctx.layout.object_path(oid, name)
    }

    async fn drive(&self, lines: &[String]) -> AgentResult<Vec<Value>> {
        let input = lines.join("\n") + "\n";
        let mut output = Cursor::new(Vec::new());
        agent::run(&self.ctx, BufReader::new(input.as_bytes()), &mut output).await?;

        Ok(String::from_utf8(output.into_inner())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect())
    }
}

fn init_line(operation: &str) -> String {
    json!({
        "event": "init",
        "operation": operation,
        "remote": "origin",
        "concurrent": false,
        "concurrenttransfers": 1,
    })
    .to_string()
}

fn upload_line(oid: &str, size: usize, path: &Path) -> String {
    json!({
        "event": "upload",
        "oid": oid,
        "size": size,
        "path": path.to_str().unwrap(),
        "action": {"href": format!("alice/{}/upload", oid)},
    })
    .to_string()
}

fn download_line(oid: &str, size: usize, filename: &str) -> String {
    json!({
        "event": "download",
        "oid": oid,
        "size": size,
        "action": {"href": format!("s3://bucket/alice/{}/{}", oid, filename)},
    })
    .to_string()
}

fn terminate_line() -> String {
    json!({"event": "terminate"}).to_string()
}

fn assert_ok(response: &Value, oid: &str) {
    assert_eq!(response["event"], "complete");
    assert_eq!(response["oid"], oid);
    assert!(response.get("error").is_none(), "unexpected error: {}", response);
}

fn assert_failed(response: &Value, oid: &str, needle: &str) {
    assert_eq!(response["event"], "complete");
    assert_eq!(response["oid"], oid);
    assert_eq!(response["error"]["code"], 1);
    let message = response["error"]["message"].as_str().unwrap();
    assert!(
        message.contains(needle),
        "message {:?} does not mention {:?}",
        message,
        needle
    );
}

#[tokio::test]
async fn test_round_trip() {
    let fx = Fixture::new();
    let data = b"col1,col2\n1,2\n3,4\n";
    let oid = sha256_bytes(data);
    let source = fx.write_source("test.csv", data);

    let responses = fx
        .drive(&[
            init_line("upload"),
            upload_line(&oid, data.len(), &source),
            terminate_line(),
        ])
        .await
        .unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0], json!({}));
    assert_ok(&responses[1], &oid);
    assert!(responses[1].get("path").is_none());

    let stored = fx.store.object(&format!("alice/{}", oid)).unwrap();
    assert_eq!(stored.data, data);
    assert_eq!(stored.digest.as_deref(), Some(oid.as_str()));

    let responses = fx
        .drive(&[
            init_line("download"),
            download_line(&oid, data.len(), "test.csv"),
            terminate_line(),
        ])
        .await
        .unwrap();
    assert_ok(&responses[1], &oid);

    let path = PathBuf::from(responses[1]["path"].as_str().unwrap());
    assert_eq!(path, fx.cache_path(&oid, "test.csv"));
    assert!(path.ends_with(format!("{}/test.csv", &oid[..16])));
    assert_eq!(std::fs::read(&path).unwrap(), data);
}

#[tokio::test]
async fn test_upload_dedup_skips_store_write() {
    let fx = Fixture::new();
    let data = b"already uploaded";
    let oid = sha256_bytes(data);
    let source = fx.write_source("a.bin", data);

    let responses = fx
        .drive(&[
            init_line("upload"),
            upload_line(&oid, data.len(), &source),
            upload_line(&oid, data.len(), &source),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_ok(&responses[1], &oid);
    assert_ok(&responses[2], &oid);
    assert_eq!(fx.store.put_calls(), 1);
}

#[tokio::test]
async fn test_upload_replaces_object_with_stale_digest() {
    let fx = Fixture::new();
    let data = b"fresh content";
    let oid = sha256_bytes(data);
    let source = fx.write_source("a.bin", data);
    // same key, different recorded digest
    fx.store
        .insert(&format!("alice/{}", oid), b"old", Some("0000"));

    let responses = fx
        .drive(&[
            init_line("upload"),
            upload_line(&oid, data.len(), &source),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_ok(&responses[1], &oid);
    assert_eq!(fx.store.put_calls(), 1);
    assert_eq!(fx.store.object(&format!("alice/{}", oid)).unwrap().data, data);
}

#[tokio::test]
async fn test_upload_digest_mismatch_fails_before_store_write() {
    let fx = Fixture::new();
    let source = fx.write_source("a.bin", b"actual content");
    let declared = sha256_bytes(b"something else");

    let responses = fx
        .drive(&[
            init_line("upload"),
            upload_line(&declared, 14, &source),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_failed(&responses[1], &declared, "digest mismatch");
    assert_eq!(fx.store.put_calls(), 0);
}

#[tokio::test]
async fn test_upload_without_path_fails() {
    let fx = Fixture::new();
    let line = json!({"event": "upload", "oid": "abc", "size": 1}).to_string();

    let responses = fx
        .drive(&[init_line("upload"), line, terminate_line()])
        .await
        .unwrap();

    assert_failed(&responses[1], "abc", "malformed transfer event");
}

#[tokio::test]
async fn test_download_cache_hit_skips_store_read() {
    let fx = Fixture::new();
    let data = b"cached bytes";
    let oid = sha256_bytes(data);
    fx.store.insert(&format!("alice/{}", oid), data, Some(&oid));

    let responses = fx
        .drive(&[
            init_line("download"),
            download_line(&oid, data.len(), "f.bin"),
            download_line(&oid, data.len(), "f.bin"),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_ok(&responses[1], &oid);
    assert_ok(&responses[2], &oid);
    assert_eq!(responses[1]["path"], responses[2]["path"]);
    assert_eq!(fx.store.get_calls(), 1);
}

#[tokio::test]
async fn test_download_refetches_stale_cache_entry() {
    let fx = Fixture::new();
    let data = b"full object content";
    let oid = sha256_bytes(data);
    fx.store.insert(&format!("alice/{}", oid), data, Some(&oid));

    // truncated leftover at the final path
    let target = fx.cache_path(&oid, "f.bin");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, b"full obj").unwrap();

    let responses = fx
        .drive(&[
            init_line("download"),
            download_line(&oid, data.len(), "f.bin"),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_ok(&responses[1], &oid);
    assert_eq!(fx.store.get_calls(), 1);
    assert_eq!(std::fs::read(&target).unwrap(), data);
}

#[tokio::test]
async fn test_download_backfills_missing_digest_tag() {
    let fx = Fixture::new();
    let data = b"legacy object";
    let oid = sha256_bytes(data);
    let key = format!("alice/{}", oid);
    fx.store.insert(&key, data, None);

    let responses = fx
        .drive(&[
            init_line("download"),
            download_line(&oid, data.len(), "legacy.bin"),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_ok(&responses[1], &oid);
    assert_eq!(fx.store.copy_calls(), 1);
    assert_eq!(fx.store.object(&key).unwrap().digest.as_deref(), Some(oid.as_str()));
}

#[tokio::test]
async fn test_download_leaves_existing_digest_tag_alone() {
    let fx = Fixture::new();
    let data = b"tagged object";
    let oid = sha256_bytes(data);
    fx.store.insert(&format!("alice/{}", oid), data, Some(&oid));

    fx.drive(&[
        init_line("download"),
        download_line(&oid, data.len(), "f.bin"),
        terminate_line(),
    ])
    .await
    .unwrap();

    assert_eq!(fx.store.copy_calls(), 0);
}

#[tokio::test]
async fn test_download_corrupt_body_fails_and_stages_nothing() {
    let fx = Fixture::new();
    let data = b"remote holds different bytes";
    let declared = sha256_bytes(b"what the caller expected");
    fx.store
        .insert(&format!("alice/{}", declared), data, Some(&declared));

    let responses = fx
        .drive(&[
            init_line("download"),
            download_line(&declared, data.len(), "f.bin"),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_failed(&responses[1], &declared, "digest mismatch");
    assert!(!fx.cache_path(&declared, "f.bin").exists());
    assert!(!fx.ctx.layout.staging_path(&declared).exists());
}

#[tokio::test]
async fn test_malformed_reference_fails_and_loop_continues() {
    let fx = Fixture::new();
    let data = b"good object";
    let oid = sha256_bytes(data);
    fx.store.insert(&format!("alice/{}", oid), data, Some(&oid));

    let bad = json!({
        "event": "download",
        "oid": oid,
        "size": data.len(),
        "action": {"href": "nosep"},
    })
    .to_string();

    let responses = fx
        .drive(&[
            init_line("download"),
            bad,
            download_line(&oid, data.len(), "f.bin"),
            terminate_line(),
        ])
        .await
        .unwrap();

    // responses come back in request order
    assert_eq!(responses.len(), 3);
    assert_failed(&responses[1], &oid, "invalid object reference");
    assert_ok(&responses[2], &oid);
}

#[tokio::test]
async fn test_unknown_event_produces_no_response() {
    let fx = Fixture::new();
    let data = b"payload";
    let oid = sha256_bytes(data);
    let source = fx.write_source("p.bin", data);

    let responses = fx
        .drive(&[
            init_line("upload"),
            json!({"event": "progress", "oid": oid}).to_string(),
            upload_line(&oid, data.len(), &source),
            terminate_line(),
        ])
        .await
        .unwrap();

    assert_eq!(responses.len(), 2);
    assert_ok(&responses[1], &oid);
}

#[tokio::test]
async fn test_end_of_input_acts_as_terminate() {
    let fx = Fixture::new();
    let responses = fx.drive(&[init_line("download")]).await.unwrap();
    assert_eq!(responses, vec![json!({})]);
}

#[tokio::test]
async fn test_undecodable_line_is_fatal() {
    let fx = Fixture::new();
    let err = fx
        .drive(&[init_line("download"), "this is not json".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Protocol(_)));
}
