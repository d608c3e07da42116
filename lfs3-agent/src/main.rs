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

use clap::Parser;
use lfs3_agent::agent;
use lfs3_agent::cache::CacheLayout;
use lfs3_agent::store::S3Store;
use lfs3_agent::{init_logging, AgentContext};
use lfs3_common::conf::AgentConf;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about = "git-lfs custom transfer agent backed by S3-compatible storage", long_about = None)]
struct AgentArgs {
    /// Local cache directory (overrides LFS_LOCAL_STORAGE)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Verbose logging (overrides LFS_VERBOSE)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = AgentArgs::parse();

    let mut conf = match AgentConf::from_env() {
        Ok(conf) => conf,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(cache_dir) = args.cache_dir {
        conf.cache_dir = cache_dir;
    }
    conf.verbose |= args.verbose;

    init_logging(conf.verbose);
    info!(
        "starting transfer agent: bucket={}, namespace={}, cache={}",
        conf.bucket,
        conf.namespace,
        conf.cache_dir.display()
    );

    let store = S3Store::connect(&conf).await;
    let ctx = AgentContext::new(
        Arc::new(store),
        CacheLayout::new(conf.cache_dir.clone(), conf.prefix_len),
        conf.namespace.clone(),
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    if let Err(e) = agent::run(&ctx, stdin, stdout).await {
        error!("agent terminated: {}", e);
        std::process::exit(1);
    }
}
