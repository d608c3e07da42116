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

//! The protocol event loop.
//!
//! One JSON event per input line, processed to completion before the next
//! line is read; exactly one response line per transfer event, in request
//! order. Handler failures become failure responses and the loop keeps
//! going; only an unreadable or undecodable input line ends the process.
//! End of input is equivalent to `terminate`.

use crate::cache::CacheLayout;
use crate::handler;
use crate::store::ObjectStore;
use lfs3_common::proto::{AgentEvent, CompleteEvent};
use lfs3_common::{AgentError, AgentResult};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Everything the handlers need, constructed once at startup.
pub struct AgentContext {
    pub store: Arc<dyn ObjectStore>,
    pub layout: CacheLayout,
    pub namespace: String,
}

impl AgentContext {
    pub fn new(store: Arc<dyn ObjectStore>, layout: CacheLayout, namespace: String) -> Self {
        Self {
            store,
            layout,
            namespace,
        }
    }

    pub fn object_key(&self, oid: &str) -> String {
        format!("{}/{}", self.namespace, oid)
    }
}

pub async fn run<R, W>(ctx: &AgentContext, input: R, mut output: W) -> AgentResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| AgentError::protocol(format!("failed to read event stream: {}", e)))?;
        let line = match &line {
            Some(l) => l.trim(),
            None => {
                info!("event stream closed");
                return Ok(());
            }
        };
        if line.is_empty() {
            continue;
        }

        let event: AgentEvent = serde_json::from_str(line)
            .map_err(|e| AgentError::protocol(format!("malformed event line: {}", e)))?;

        match event {
            AgentEvent::Init(init) => {
                info!(
                    "init: operation={}, remote={}",
                    init.operation, init.remote
                );
                if init.concurrent || init.concurrenttransfers > 1 {
                    // Advisory only; transfers are processed one at a time.
                    debug!(
                        "init requested up to {} concurrent transfers, running sequentially",
                        init.concurrenttransfers
                    );
                }
                write_line(&mut output, b"{}").await?;
            }
            AgentEvent::Upload(ev) => {
                let response = match handler::upload(ctx, &ev).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        warn!("upload {} failed: {}", ev.oid, e);
                        CompleteEvent::fail(&ev.oid, &e)
                    }
                };
                write_response(&mut output, &response).await?;
            }
            AgentEvent::Download(ev) => {
                let response = match handler::download(ctx, &ev).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        warn!("download {} failed: {}", ev.oid, e);
                        CompleteEvent::fail(&ev.oid, &e)
                    }
                };
                write_response(&mut output, &response).await?;
            }
            AgentEvent::Terminate => {
                info!("terminate received");
                return Ok(());
            }
            AgentEvent::Unknown => {
                warn!("ignoring unrecognized event: {}", line);
            }
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    output: &mut W,
    response: &CompleteEvent,
) -> AgentResult<()> {
    let encoded = serde_json::to_vec(response)
        .map_err(|e| AgentError::protocol(format!("failed to encode response: {}", e)))?;
    write_line(output, &encoded).await
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &[u8]) -> AgentResult<()> {
    output
        .write_all(line)
        .await
        .map_err(|e| AgentError::protocol(format!("failed to write response: {}", e)))?;
    output
        .write_all(b"\n")
        .await
        .map_err(|e| AgentError::protocol(format!("failed to write response: {}", e)))?;
    output
        .flush()
        .await
        .map_err(|e| AgentError::protocol(format!("failed to flush response: {}", e)))?;
    Ok(())
}
