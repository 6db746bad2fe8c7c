//! Declarative source configuration.
//!
//! ```json
//! { "kind": "http", "url": "https://example.com/app-{{.OS}}-{{.Arch}}{{.Ext}}", "timeout_secs": 60 }
//! { "kind": "aws", "bucket": "releases", "key": "app/{{.OS}}/{{.Executable}}{{.Ext}}" }
//! { "kind": "minio", "endpoint": "http://127.0.0.1:9000", "bucket": "releases", "key": "app" }
//! ```

use crate::error::Result;
use crate::executable::ExecutableResolver;
use crate::http::HttpSource;
use crate::logger::Logger;
use crate::source::Source;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Where updates are published and how to reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Plain HTTP(S) server.
    Http {
        /// Artifact URL template.
        url: String,
        /// Overall request timeout applied to the HTTP client.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
    /// S3 bucket accessed through the AWS SDK.
    #[cfg(feature = "aws")]
    Aws {
        /// Bucket holding the artifact.
        bucket: String,
        /// Object key template.
        key: String,
        /// Overrides the region from the environment.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        /// Alternate S3 endpoint, e.g. a local gateway.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
        #[serde(default)]
        path_style: bool,
    },
    /// MinIO or another S3-compatible server.
    #[cfg(feature = "minio")]
    Minio {
        /// Server address; `https://` is assumed without a scheme.
        endpoint: String,
        /// Bucket holding the artifact.
        bucket: String,
        /// Object key template.
        key: String,
        /// Signing region, `us-east-1` when empty.
        #[serde(default)]
        region: String,
        /// Access key; requests are anonymous without one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret_key: Option<String>,
    },
}

impl SourceConfig {
    /// Decode a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Build the configured source, rendering its location template.
    pub async fn build(
        &self,
        resolver: &ExecutableResolver,
        logger: Arc<dyn Logger>,
    ) -> Result<Box<dyn Source>> {
        match self {
            SourceConfig::Http { url, timeout_secs } => {
                let mut client = reqwest::Client::builder();
                if let Some(secs) = timeout_secs {
                    client = client.timeout(Duration::from_secs(*secs));
                }
                let source = HttpSource::builder()
                    .client(client.build()?)
                    .resolver(resolver)
                    .logger(logger)
                    .build(url);
                Ok(Box::new(source))
            }
            #[cfg(feature = "aws")]
            SourceConfig::Aws {
                bucket,
                key,
                region,
                endpoint,
                path_style,
            } => {
                let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
                if let Some(region) = region {
                    loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
                }
                if let Some(endpoint) = endpoint {
                    loader = loader.endpoint_url(endpoint.clone());
                }
                let shared = loader.load().await;
                let config = aws_sdk_s3::config::Builder::from(&shared)
                    .force_path_style(*path_style)
                    .build();

                let client = aws_sdk_s3::Client::from_conf(config);
                let source =
                    crate::aws::AwsSource::with_context(client, bucket, key, resolver, logger);
                Ok(Box::new(source))
            }
            #[cfg(feature = "minio")]
            SourceConfig::Minio {
                endpoint,
                bucket,
                key,
                region,
                access_key,
                secret_key,
            } => {
                let credentials = access_key.as_deref().zip(secret_key.as_deref());
                let bucket = crate::minio::open_bucket(endpoint, region, bucket, credentials)?;
                let source = crate::minio::MinioSource::with_context(bucket, key, resolver, logger);
                Ok(Box::new(source))
            }
        }
    }
}
