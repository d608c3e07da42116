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

mod s3_store;
pub use s3_store::S3Store;

use async_trait::async_trait;
use lfs3_common::AgentResult;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncRead;

/// User-metadata key carrying an object's content digest.
pub const DIGEST_METADATA_KEY: &str = "sha256";

/// Streaming body of a fetched object.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata of a store-resident object, as reported by a HEAD-style query.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    pub size: i64,
    /// Recorded content digest; absent for objects uploaded before digest
    /// tagging existed.
    pub digest: Option<String>,
}

/// The object-store collaborator seam.
///
/// `head` distinguishes "confirmed absent" (`Ok(None)`) from "could not
/// determine" (`Err`); callers must not treat a query failure as absence
/// when deciding to skip a transfer.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head(&self, key: &str) -> AgentResult<Option<RemoteObject>>;

    async fn get(&self, key: &str) -> AgentResult<ObjectReader>;

    /// Upload a local file under `key`, tagged with its content digest.
    async fn put(&self, key: &str, source: &Path, digest: &str) -> AgentResult<()>;

    /// Rewrite an existing object's metadata to record its content digest.
    async fn backfill_digest(&self, key: &str, digest: &str) -> AgentResult<()>;
}
