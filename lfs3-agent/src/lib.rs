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

//! git-lfs custom transfer agent backed by S3-compatible object storage.
//!
//! The agent is spawned by `git lfs` and speaks newline-delimited JSON on
//! stdin/stdout. Uploads and downloads are skipped entirely when a digest
//! comparison proves the remote store or the local cache already holds the
//! requested content; actual downloads are committed into a hash-sharded
//! cache tree with a stage-then-rename step so a partially written file is
//! never visible at its final path.

pub mod agent;
pub mod cache;
pub mod handler;
pub mod store;

pub use agent::AgentContext;

use tracing_subscriber::EnvFilter;

/// Install the global log subscriber. All output goes to stderr; stdout
/// carries only protocol responses.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_log::LogTracer::init();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
