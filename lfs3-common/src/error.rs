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

use std::path::Path;
use thiserror::Error;

pub type AgentResult<T> = Result<T, AgentError>;

/// Failure kinds surfaced by the transfer agent. Every variant is converted
/// into a failure response at the handler boundary; only `Protocol` aborts
/// the event loop.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to read local file {path}: {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("content digest mismatch for {oid}: computed {actual}")]
    DigestMismatch { oid: String, actual: String },

    #[error("store query failed: {0}")]
    StoreQuery(String),

    #[error("store read failed: {0}")]
    StoreRead(String),

    #[error("store write failed: {0}")]
    StoreWrite(String),

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object reference: {0}")]
    InvalidRef(String),

    #[error("malformed transfer event: {0}")]
    MalformedEvent(String),

    #[error("configuration error: {0}")]
    Conf(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl AgentError {
    // All failures share one wire code; kinds are carried in the message.
    pub const WIRE_CODE: i32 = 1;

    pub fn local_file(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::LocalFile {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn store_query(msg: impl Into<String>) -> Self {
        Self::StoreQuery(msg.into())
    }

    pub fn store_read(msg: impl Into<String>) -> Self {
        Self::StoreRead(msg.into())
    }

    pub fn store_write(msg: impl Into<String>) -> Self {
        Self::StoreWrite(msg.into())
    }

    pub fn create_dir(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Rename {
            from: from.as_ref().display().to_string(),
            to: to.as_ref().display().to_string(),
            source,
        }
    }

    pub fn invalid_ref(msg: impl Into<String>) -> Self {
        Self::InvalidRef(msg.into())
    }

    pub fn malformed_event(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }

    pub fn conf(msg: impl Into<String>) -> Self {
        Self::Conf(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
