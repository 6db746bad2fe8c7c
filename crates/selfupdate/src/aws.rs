use crate::error::{Result, SourceError};
use crate::executable::ExecutableResolver;
use crate::logger::{self, Logger};
use crate::platform::{render_location, Platform};
use crate::signature::{read_signature, signature_location, DetachedSignature};
use crate::source::{Download, Source};
use crate::version::Version;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use std::sync::Arc;

/// Source reading the artifact from an S3 bucket through the AWS SDK. The
/// rendered location is the object key; the signature is the object at
/// `key + ".ed25519"`.
#[derive(Clone)]
pub struct AwsSource {
    client: Client,
    bucket: String,
    key: String,
    logger: Arc<dyn Logger>,
}

impl AwsSource {
    /// Source for `location` in `bucket`, using the process-wide resolver.
    pub fn new(client: Client, bucket: impl Into<String>, location: &str) -> Self {
        let resolver = ExecutableResolver::process();
        Self::with_context(client, bucket, location, resolver, logger::noop())
    }

    /// Source with an explicit resolver and logger.
    pub fn with_context(
        client: Client,
        bucket: impl Into<String>,
        location: &str,
        resolver: &ExecutableResolver,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let key = render_location(location, &Platform::current(resolver), logger.as_ref());
        Self {
            client,
            bucket: bucket.into(),
            key,
            logger,
        }
    }

    /// Build a client from the default AWS configuration chain (environment,
    /// profile files, instance metadata).
    pub async fn from_env(bucket: impl Into<String>, location: &str) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket, location)
    }

    /// Bucket holding the artifact.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Rendered object key of the artifact.
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn get(&self, key: &str) -> Result<Download> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        let content_length = object.content_length().and_then(|len| u64::try_from(len).ok());
        Ok(Download::new(object.body.into_async_read(), content_length))
    }
}

#[async_trait]
impl Source for AwsSource {
    async fn fetch(&self, _known: Option<&Version>) -> Result<Download> {
        self.logger
            .debug(format_args!("fetching s3://{}/{}", self.bucket, self.key));
        self.get(&self.key).await
    }

    async fn fetch_signature(&self) -> Result<DetachedSignature> {
        let key = signature_location(&self.key);
        let download = self.get(&key).await?;
        read_signature(download.content_length, download.reader)
            .await
            .inspect_err(|err| {
                self.logger
                    .error(format_args!("signature at s3://{}/{key}: {err}", self.bucket))
            })
    }

    async fn latest_version(&self) -> Result<Version> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(aws_sdk_s3::Error::from)?;

        let modified = head.last_modified().ok_or(SourceError::MissingVersion)?;
        Version::from_unix(modified.secs(), modified.subsec_nanos())
    }
}
