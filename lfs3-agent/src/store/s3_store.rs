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

//! `ObjectStore` implementation on the AWS SDK. Works against AWS S3 and
//! S3-compatible stores (custom endpoint + path-style addressing). Network
//! retries and authentication are the SDK's concern, not the agent's.

use crate::store::{ObjectReader, ObjectStore, RemoteObject, DIGEST_METADATA_KEY};
use async_trait::async_trait;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{MetadataDirective, ObjectCannedAcl};
use aws_sdk_s3::Client;
use lfs3_common::conf::AgentConf;
use lfs3_common::{AgentError, AgentResult};
use log::debug;
use std::path::Path;

pub struct S3Store {
    client: Client,
    bucket: String,
    acl: Option<ObjectCannedAcl>,
}

impl S3Store {
    pub async fn connect(conf: &AgentConf) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = conf.region.clone() {
            loader = loader.region(Region::new(region));
        }
        if let Some(profile) = &conf.profile {
            loader = loader.credentials_provider(
                ProfileFileCredentialsProvider::builder()
                    .profile_name(profile)
                    .build(),
            );
        }

        let sdk_conf = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_conf);
        if let Some(endpoint) = &conf.endpoint {
            // Most S3-compatible stores require path-style addressing.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let acl = conf.acl.as_deref().map(ObjectCannedAcl::from);
        debug!(
            "connected to bucket {} (endpoint={:?}, region={:?})",
            conf.bucket, conf.endpoint, conf.region
        );

        Self {
            client: Client::from_conf(builder.build()),
            bucket: conf.bucket.clone(),
            acl,
        }
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            acl: None,
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head(&self, key: &str) -> AgentResult<Option<RemoteObject>> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(out) => {
                let digest = out
                    .metadata()
                    .and_then(|m| m.get(DIGEST_METADATA_KEY))
                    .cloned();
                Ok(Some(RemoteObject {
                    size: out.content_length().unwrap_or(0),
                    digest,
                }))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(AgentError::store_query(format!(
                        "head {}/{}: {}",
                        self.bucket, key, service_err
                    )))
                }
            }
        }
    }

    async fn get(&self, key: &str) -> AgentResult<ObjectReader> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AgentError::store_read(format!(
                    "get {}/{}: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(Box::pin(out.body.into_async_read()))
    }

    async fn put(&self, key: &str, source: &Path, digest: &str) -> AgentResult<()> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| AgentError::local_file(source, std::io::Error::other(e)))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .metadata(DIGEST_METADATA_KEY, digest);
        if let Some(acl) = &self.acl {
            request = request.acl(acl.clone());
        }

        request.send().await.map_err(|e| {
            AgentError::store_write(format!(
                "put {}/{}: {}",
                self.bucket,
                key,
                DisplayErrorContext(&e)
            ))
        })?;

        Ok(())
    }

    async fn backfill_digest(&self, key: &str, digest: &str) -> AgentResult<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .key(key)
            .copy_source(format!("{}/{}", self.bucket, key))
            .metadata_directive(MetadataDirective::Replace)
            .metadata(DIGEST_METADATA_KEY, digest)
            .send()
            .await
            .map_err(|e| {
                AgentError::store_write(format!(
                    "update metadata {}/{}: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }
}
