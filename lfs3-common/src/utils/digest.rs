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

//! Content digest computation.
//!
//! Objects are identified by the lowercase hex SHA-256 of their full byte
//! content; the same digest doubles as the integrity proof for cache hits
//! and fetched data. Files are hashed in fixed-size chunks, never buffered
//! whole.

use crate::{AgentError, AgentResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

pub const DIGEST_CHUNK_SIZE: usize = 64 * 1024;

/// Incremental SHA-256, for hashing a stream while it is being written out.
pub struct Sha256Digest {
    inner: Sha256,
}

impl Sha256Digest {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finish_hex(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

impl Default for Sha256Digest {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256Digest::new();
    hasher.update(data);
    hasher.finish_hex()
}

/// Stream a file through SHA-256 and return the hex digest.
pub async fn sha256_file(path: impl AsRef<Path>) -> AgentResult<String> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .map_err(|e| AgentError::local_file(path, e))?;
    let mut reader = BufReader::with_capacity(DIGEST_CHUNK_SIZE, file);

    let mut hasher = Sha256Digest::new();
    let mut buf = vec![0u8; DIGEST_CHUNK_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| AgentError::local_file(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finish_hex())
}
