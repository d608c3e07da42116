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

//! Agent configuration.
//!
//! Every value the agent needs is read exactly once at startup, either from
//! the process environment (`from_env`) or from an explicit key/value map
//! (`from_map`, the testable form). Nothing downstream reads ambient
//! process state.

use crate::{AgentError, AgentResult};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AgentConf {
    /// Shared-credentials profile selector; falls back to the SDK default
    /// credential chain when unset.
    pub profile: Option<String>,
    /// Custom endpoint URL for S3-compatible stores.
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub bucket: String,
    /// Per-user key namespace; object keys are `<namespace>/<oid>`.
    pub namespace: String,
    pub cache_dir: PathBuf,
    pub verbose: bool,
    /// Leading characters of the object id used as the cache shard directory.
    pub prefix_len: usize,
    /// Canned ACL applied to uploaded objects; unset leaves the bucket
    /// default (private).
    pub acl: Option<String>,
}

impl AgentConf {
    pub const ENV_PROFILE: &'static str = "LFS_AWS_PROFILE";
    pub const ENV_ENDPOINT: &'static str = "LFS_AWS_ENDPOINT";
    pub const ENV_REGION: &'static str = "LFS_AWS_REGION";
    pub const ENV_BUCKET: &'static str = "LFS_S3_BUCKET";
    pub const ENV_USER: &'static str = "LFS_AWS_USER";
    pub const ENV_CACHE_DIR: &'static str = "LFS_LOCAL_STORAGE";
    pub const ENV_VERBOSE: &'static str = "LFS_VERBOSE";
    pub const ENV_PREFIX_LEN: &'static str = "LFS_CACHE_PREFIX_LEN";
    pub const ENV_ACL: &'static str = "LFS_S3_ACL";

    pub const DEFAULT_CACHE_DIR: &'static str = ".git/lfs/objects";
    pub const DEFAULT_PREFIX_LEN: usize = 16;

    const ENV_KEYS: [&'static str; 9] = [
        Self::ENV_PROFILE,
        Self::ENV_ENDPOINT,
        Self::ENV_REGION,
        Self::ENV_BUCKET,
        Self::ENV_USER,
        Self::ENV_CACHE_DIR,
        Self::ENV_VERBOSE,
        Self::ENV_PREFIX_LEN,
        Self::ENV_ACL,
    ];

    pub fn from_env() -> AgentResult<Self> {
        let mut props = HashMap::new();
        for key in Self::ENV_KEYS {
            if let Ok(value) = std::env::var(key) {
                props.insert(key.to_string(), value);
            }
        }
        Self::from_map(&props)
    }

    pub fn from_map(props: &HashMap<String, String>) -> AgentResult<Self> {
        let bucket = required(props, Self::ENV_BUCKET)?;
        let namespace = required(props, Self::ENV_USER)?;

        let cache_dir = optional(props, Self::ENV_CACHE_DIR)
            .unwrap_or_else(|| Self::DEFAULT_CACHE_DIR.to_string());

        let prefix_len = match optional(props, Self::ENV_PREFIX_LEN) {
            Some(v) => v.parse::<usize>().map_err(|_| {
                AgentError::conf(format!(
                    "{} must be a non-negative integer, got {:?}",
                    Self::ENV_PREFIX_LEN,
                    v
                ))
            })?,
            None => Self::DEFAULT_PREFIX_LEN,
        };

        let verbose = optional(props, Self::ENV_VERBOSE)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Ok(Self {
            profile: optional(props, Self::ENV_PROFILE),
            endpoint: optional(props, Self::ENV_ENDPOINT),
            region: optional(props, Self::ENV_REGION),
            bucket,
            namespace,
            cache_dir: PathBuf::from(cache_dir),
            verbose,
            prefix_len,
            acl: optional(props, Self::ENV_ACL),
        })
    }
}

impl Default for AgentConf {
    fn default() -> Self {
        Self {
            profile: None,
            endpoint: None,
            region: None,
            bucket: String::new(),
            namespace: String::new(),
            cache_dir: PathBuf::from(Self::DEFAULT_CACHE_DIR),
            verbose: false,
            prefix_len: Self::DEFAULT_PREFIX_LEN,
            acl: None,
        }
    }
}

fn optional(props: &HashMap<String, String>, key: &str) -> Option<String> {
    props
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(props: &HashMap<String, String>, key: &str) -> AgentResult<String> {
    optional(props, key).ok_or_else(|| AgentError::conf(format!("{} is not set", key)))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
