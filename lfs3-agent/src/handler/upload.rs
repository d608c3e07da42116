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
use lfs3_common::proto::{CompleteEvent, TransferEvent};
use lfs3_common::utils::digest;
use lfs3_common::{AgentError, AgentResult};
use log::{debug, warn};

/// Upload a local object, unless the remote store already holds it.
///
/// The caller-declared oid is not trusted: the local file is re-hashed
/// before it is used for the skip decision or the remote digest tag, and a
/// mismatch fails the transfer before any network traffic. An object
/// uploaded under an oid its content does not hash to would be unreadable
/// under its advertised identity forever after.
pub async fn upload(ctx: &AgentContext, event: &TransferEvent) -> AgentResult<CompleteEvent> {
    let path = event
        .path
        .as_ref()
        .ok_or_else(|| AgentError::malformed_event("upload event carries no local path"))?;

    let local_digest = digest::sha256_file(path).await?;
    if local_digest != event.oid {
        return Err(AgentError::DigestMismatch {
            oid: event.oid.clone(),
            actual: local_digest,
        });
    }

    let key = ctx.object_key(&event.oid);
    match ctx.store.head(&key).await {
        Ok(Some(remote)) if remote.digest.as_deref() == Some(event.oid.as_str()) => {
            debug!("upload {}: remote content matches, skipping", event.oid);
            return Ok(CompleteEvent::ok(&event.oid, None));
        }
        Ok(_) => {}
        // "could not determine" is not "absent": upload rather than skip
        Err(e) => {
            warn!(
                "upload {}: existence check failed, uploading anyway: {}",
                event.oid, e
            );
        }
    }

    ctx.store.put(&key, path, &event.oid).await?;
    debug!("upload {}: stored {} bytes at {}", event.oid, event.size, key);

    Ok(CompleteEvent::ok(&event.oid, None))
}
