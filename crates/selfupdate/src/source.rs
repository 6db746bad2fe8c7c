use crate::error::Result;
use crate::signature::DetachedSignature;
use crate::version::Version;
use async_trait::async_trait;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

// initial buffer bound for `Download::into_bytes`
const PREALLOCATE_LIMIT: u64 = 1 << 20;

/// Byte stream of a candidate artifact. Dropping it releases the underlying
/// connection, including after a partial read.
pub type ArtifactStream = Pin<Box<dyn AsyncRead + Send>>;

/// Abstraction over a place updates are published to.
///
/// Implementations issue at most one request per call, never retry and
/// impose no timeout of their own; bounding is configured on the client they
/// wrap.
#[async_trait]
pub trait Source: Send + Sync {
    /// Open the artifact. A non-zero `known` version is a hint that
    /// transports supporting conditional retrieval may forward; others
    /// ignore it.
    async fn fetch(&self, known: Option<&Version>) -> Result<Download>;

    /// Fetch the detached signature stored next to the artifact.
    async fn fetch_signature(&self) -> Result<DetachedSignature>;

    /// Modification timestamp of the published artifact.
    async fn latest_version(&self) -> Result<Version>;
}

#[async_trait]
impl<S> Source for Box<S>
where
    S: Source + ?Sized,
{
    async fn fetch(&self, known: Option<&Version>) -> Result<Download> {
        (**self).fetch(known).await
    }

    async fn fetch_signature(&self) -> Result<DetachedSignature> {
        (**self).fetch_signature().await
    }

    async fn latest_version(&self) -> Result<Version> {
        (**self).latest_version().await
    }
}

#[async_trait]
impl<S> Source for Arc<S>
where
    S: Source + ?Sized,
{
    async fn fetch(&self, known: Option<&Version>) -> Result<Download> {
        (**self).fetch(known).await
    }

    async fn fetch_signature(&self) -> Result<DetachedSignature> {
        (**self).fetch_signature().await
    }

    async fn latest_version(&self) -> Result<Version> {
        (**self).latest_version().await
    }
}

/// An opened artifact.
pub struct Download {
    /// Artifact bytes.
    pub reader: ArtifactStream,
    /// Length announced by the transport, `None` when unknown (e.g. chunked
    /// transfer encoding).
    pub content_length: Option<u64>,
}

impl Download {
    /// Wrap a reader and its announced length.
    pub fn new<R>(reader: R, content_length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            reader: Box::pin(reader),
            content_length,
        }
    }

    /// Read the whole artifact into memory. The announced length only sizes
    /// the initial buffer, up to 1 MiB.
    pub async fn into_bytes(mut self) -> Result<Vec<u8>> {
        let capacity = self
            .content_length
            .map_or(0, |len| len.min(PREALLOCATE_LIMIT) as usize);
        let mut bytes = Vec::with_capacity(capacity);
        self.reader.read_to_end(&mut bytes).await?;
        Ok(bytes)
    }
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn announced_length_does_not_size_the_buffer() {
        let download = Download::new(&b"abc"[..], Some(u64::MAX / 2));
        assert_eq!(download.into_bytes().await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn unknown_length_reads_everything() {
        let body = vec![9u8; 70_000];
        let download = Download::new(std::io::Cursor::new(body.clone()), None);
        assert_eq!(download.into_bytes().await.unwrap(), body);
    }
}
