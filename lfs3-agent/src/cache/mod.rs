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

//! Hash-sharded local cache tree.
//!
//! There is no index beside the filesystem: an object lives at
//! `<cache_dir>/<shard>/<name>` where `shard` is the leading characters of
//! its digest, and an entry is valid iff its size and recomputed digest
//! match. In-flight downloads are written under `<cache_dir>/tmp/` and
//! renamed into place, so the final path only ever holds complete data.

use lfs3_common::utils::digest;
use lfs3_common::{AgentError, AgentResult};
use log::warn;
use std::path::{Path, PathBuf};
use tokio::fs;

const STAGING_DIR: &str = "tmp";

/// Pure path resolution for the cache tree. Same inputs, same paths.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    cache_dir: PathBuf,
    prefix_len: usize,
}

impl CacheLayout {
    pub fn new(cache_dir: impl Into<PathBuf>, prefix_len: usize) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            prefix_len,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn shard<'a>(&self, oid: &'a str) -> &'a str {
        let end = self.prefix_len.min(oid.len());
        // oids are expected to be hex; never cut inside a multibyte character
        if oid.is_char_boundary(end) {
            &oid[..end]
        } else {
            oid
        }
    }

    pub fn object_path(&self, oid: &str, name: &str) -> PathBuf {
        self.cache_dir.join(self.shard(oid)).join(name)
    }

    pub fn staging_path(&self, oid: &str) -> PathBuf {
        self.cache_dir
            .join(STAGING_DIR)
            .join(format!("{}.partial", oid))
    }
}

/// A cache entry satisfies a request only when it exists, its size matches
/// and its recomputed digest equals the object id. Size alone proves
/// nothing about content.
pub async fn is_valid_entry(path: &Path, size: i64, oid: &str) -> bool {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() as i64 == size => {}
        _ => return false,
    }

    match digest::sha256_file(path).await {
        Ok(actual) => actual == oid,
        Err(e) => {
            warn!("failed to hash cache entry {}: {}", path.display(), e);
            false
        }
    }
}

/// Move a fully staged download into its final cache path. The rename is the
/// only step that makes the object visible.
pub async fn commit(staging: &Path, target: &Path) -> AgentResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AgentError::create_dir(parent, e))?;
    }

    fs::rename(staging, target)
        .await
        .map_err(|e| AgentError::rename(staging, target, e))
}
