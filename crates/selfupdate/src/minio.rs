use crate::error::{Result, SourceError};
use crate::executable::ExecutableResolver;
use crate::logger::{self, Logger};
use crate::platform::{render_location, Platform};
use crate::signature::{read_signature, signature_location, DetachedSignature};
use crate::source::{Download, Source};
use crate::version::Version;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use s3::creds::Credentials;
use s3::serde_types::HeadObjectResult;
use s3::{Bucket, Region};
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;

/// Source reading the artifact from a MinIO (or any S3-compatible) server
/// through a rust-s3 [`Bucket`]. The rendered location is the object key; the
/// signature is the object at `key + ".ed25519"`.
#[derive(Clone)]
pub struct MinioSource {
    bucket: Box<Bucket>,
    key: String,
    logger: Arc<dyn Logger>,
}

impl MinioSource {
    /// Source for `location` in `bucket`, using the process-wide resolver.
    pub fn new(bucket: Box<Bucket>, location: &str) -> Self {
        let resolver = ExecutableResolver::process();
        Self::with_context(bucket, location, resolver, logger::noop())
    }

    /// Source with an explicit resolver and logger.
    pub fn with_context(
        bucket: Box<Bucket>,
        location: &str,
        resolver: &ExecutableResolver,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let key = render_location(location, &Platform::current(resolver), logger.as_ref());
        Self {
            bucket,
            key,
            logger,
        }
    }

    /// Open a path-style bucket on `endpoint`. An endpoint without a scheme
    /// is reached over HTTPS; `http://` endpoints are used as given. Without
    /// credentials requests are sent anonymously.
    pub fn connect(
        endpoint: &str,
        region: &str,
        bucket_name: &str,
        credentials: Option<(&str, &str)>,
        location: &str,
    ) -> Result<Self> {
        let bucket = open_bucket(endpoint, region, bucket_name, credentials)?;
        Ok(Self::new(bucket, location))
    }

    /// Open the bucket described by `MINIO_ENDPOINT`, `MINIO_REGION`,
    /// `MINIO_BUCKET` and optionally `MINIO_ACCESS_KEY`/`MINIO_SECRET_KEY`.
    pub fn from_env(location: &str) -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());

        let required = |name: &str| {
            var(name).ok_or_else(|| SourceError::config(format!("{name} is not set")))
        };

        let endpoint = required("MINIO_ENDPOINT")?;
        let bucket_name = required("MINIO_BUCKET")?;
        let region = var("MINIO_REGION").unwrap_or_default();
        let access = var("MINIO_ACCESS_KEY");
        let secret = var("MINIO_SECRET_KEY");
        let credentials = access.as_deref().zip(secret.as_deref());

        Self::connect(&endpoint, &region, &bucket_name, credentials, location)
    }

    /// Name of the bucket holding the artifact.
    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    /// Rendered object key of the artifact.
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn stat(&self, key: &str) -> Result<HeadObjectResult> {
        let (head, _status) = self.bucket.head_object(key).await?;
        Ok(head)
    }

    // rust-s3 streams carry no headers, so the size comes from a HEAD issued
    // first. An object replaced between the two requests is reported with the
    // previous object's length.
    async fn get(&self, key: &str) -> Result<Download> {
        let size = self
            .stat(key)
            .await?
            .content_length
            .and_then(|len| u64::try_from(len).ok());

        let response = self.bucket.get_object_stream(key).await?;
        let reader = StreamReader::new(response.bytes.map_err(io::Error::other));
        Ok(Download::new(reader, size))
    }
}

pub(crate) fn open_bucket(
    endpoint: &str,
    region: &str,
    bucket_name: &str,
    credentials: Option<(&str, &str)>,
) -> Result<Box<Bucket>> {
    let endpoint = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };
    let region = Region::Custom {
        region: if region.is_empty() { "us-east-1" } else { region }.to_string(),
        endpoint,
    };
    let credentials = match credentials {
        Some((access, secret)) => Credentials::new(Some(access), Some(secret), None, None, None),
        None => Credentials::anonymous(),
    }
    .map_err(|err| SourceError::config(format!("object store credentials: {err}")))?;

    Ok(Bucket::new(bucket_name, region, credentials)?.with_path_style())
}

#[async_trait]
impl Source for MinioSource {
    async fn fetch(&self, _known: Option<&Version>) -> Result<Download> {
        self.logger
            .debug(format_args!("fetching {}/{}", self.bucket.name(), self.key));
        self.get(&self.key).await
    }

    async fn fetch_signature(&self) -> Result<DetachedSignature> {
        let key = signature_location(&self.key);
        let download = self.get(&key).await?;
        read_signature(download.content_length, download.reader)
            .await
            .inspect_err(|err| {
                self.logger
                    .error(format_args!("signature at {}/{key}: {err}", self.bucket.name()))
            })
    }

    async fn latest_version(&self) -> Result<Version> {
        let head = self.stat(&self.key).await?;
        let modified = head.last_modified.ok_or(SourceError::MissingVersion)?;
        Version::parse_http_date(&modified)
    }
}
