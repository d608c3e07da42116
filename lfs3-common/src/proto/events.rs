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

//! Wire model for the newline-delimited JSON transfer protocol.
//!
//! Input lines decode into [`AgentEvent`], a closed enum over the `event`
//! discriminant; anything the agent does not recognize lands on the explicit
//! `Unknown` variant instead of falling through a string match. The only
//! output shape is [`CompleteEvent`]: on success the `error` member is absent
//! from the JSON entirely, since its presence is the failure signal.

use crate::AgentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum AgentEvent {
    Init(InitEvent),
    Upload(TransferEvent),
    Download(TransferEvent),
    Terminate,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitEvent {
    pub operation: String,
    #[serde(default)]
    pub remote: String,
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default)]
    pub concurrenttransfers: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferEvent {
    pub oid: String,
    #[serde(default)]
    pub size: i64,
    /// Local source file; present for uploads only.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub action: Option<TransferAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferAction {
    pub href: String,
    #[serde(default)]
    pub header: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteEvent {
    pub event: &'static str,
    pub oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TransferError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferError {
    pub code: i32,
    pub message: String,
}

impl CompleteEvent {
    pub fn ok(oid: &str, path: Option<String>) -> Self {
        Self {
            event: "complete",
            oid: oid.to_string(),
            path,
            error: None,
        }
    }

    pub fn fail(oid: &str, err: &AgentError) -> Self {
        Self {
            event: "complete",
            oid: oid.to_string(),
            path: None,
            error: Some(TransferError {
                code: AgentError::WIRE_CODE,
                message: err.to_string(),
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
