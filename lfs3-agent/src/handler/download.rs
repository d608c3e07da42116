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

use crate::agent::AgentContext;
use crate::cache;
use crate::handler::ObjectRef;
use lfs3_common::proto::{CompleteEvent, TransferEvent};
use lfs3_common::utils::digest::{Sha256Digest, DIGEST_CHUNK_SIZE};
use lfs3_common::{AgentError, AgentResult};
use log::{debug, warn};
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

/// Materialize an object into the local cache, fetching from the store only
/// when no valid cache entry exists.
pub async fn download(ctx: &AgentContext, event: &TransferEvent) -> AgentResult<CompleteEvent> {
    let action = event
        .action
        .as_ref()
        .ok_or_else(|| AgentError::malformed_event("download event carries no transfer action"))?;
    let oref = ObjectRef::parse(&action.href)?;
    if oref.oid != event.oid {
        warn!(
            "download: reference oid {} differs from event oid {}",
            oref.oid, event.oid
        );
    }

    let target = ctx.layout.object_path(&oref.oid, &oref.filename);
    if cache::is_valid_entry(&target, event.size, &oref.oid).await {
        debug!("download {}: cache hit at {}", oref.oid, target.display());
        return Ok(CompleteEvent::ok(&event.oid, Some(display(&target))));
    }

    let key = ctx.object_key(&oref.oid);
    // Only needed to decide whether the digest tag must be repaired after
    // the fetch; a failed query leaves the tag alone.
    let needs_backfill = match ctx.store.head(&key).await {
        Ok(Some(remote)) => remote.digest.is_none(),
        Ok(None) => false,
        Err(e) => {
            warn!("download {}: existence check failed: {}", oref.oid, e);
            false
        }
    };

    let staging = ctx.layout.staging_path(&oref.oid);
    let actual = fetch_to_staging(ctx, &key, &staging).await?;
    if actual != oref.oid {
        let _ = fs::remove_file(&staging).await;
        return Err(AgentError::DigestMismatch {
            oid: oref.oid.clone(),
            actual,
        });
    }

    cache::commit(&staging, &target).await?;
    debug!("download {}: committed to {}", oref.oid, target.display());

    if needs_backfill {
        // Repairs objects uploaded before digest tagging existed. The bytes
        // are already verified and committed, so a failure here only warns.
        match ctx.store.backfill_digest(&key, &actual).await {
            Ok(()) => debug!("download {}: backfilled digest tag", oref.oid),
            Err(e) => warn!("download {}: failed to backfill digest tag: {}", oref.oid, e),
        }
    }

    Ok(CompleteEvent::ok(&event.oid, Some(display(&target))))
}

/// Stream the object body into the staging path, hashing as it is written.
/// Returns the computed digest.
async fn fetch_to_staging(ctx: &AgentContext, key: &str, staging: &Path) -> AgentResult<String> {
    if let Some(parent) = staging.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AgentError::create_dir(parent, e))?;
    }

    let mut reader = ctx.store.get(key).await?;
    let file = fs::File::create(staging)
        .await
        .map_err(|e| AgentError::local_file(staging, e))?;
    let mut writer = BufWriter::new(file);

    let mut hasher = Sha256Digest::new();
    let mut buf = vec![0u8; DIGEST_CHUNK_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| AgentError::store_read(format!("read object body {}: {}", key, e)))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer
            .write_all(&buf[..n])
            .await
            .map_err(|e| AgentError::local_file(staging, e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| AgentError::local_file(staging, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| AgentError::local_file(staging, e))?;

    Ok(hasher.finish_hex())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
