use crate::executable::ResolveError;

/// Convenient result alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors that can occur while polling or fetching an update.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The AWS S3 client reported a failure.
    #[cfg(feature = "aws")]
    #[error("S3 request failed: {0}")]
    Aws(Box<aws_sdk_s3::Error>),
    /// The MinIO-compatible S3 client reported a failure.
    #[cfg(feature = "minio")]
    #[error("object store request failed: {0}")]
    S3(#[from] s3::error::S3Error),
    /// Reading a response body failed.
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The detached signature was not exactly 64 bytes long.
    #[error("ed25519 signature must be 64 bytes long and was {actual}")]
    SignatureSize {
        /// Length reported by the transport or actually read.
        actual: u64,
    },
    /// The remote artifact carries no modification timestamp.
    #[error("no Last-Modified timestamp served for the artifact")]
    MissingVersion,
    /// A modification timestamp was present but could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// The server confirmed the artifact is unchanged since the known version.
    #[error("artifact not modified since the known version")]
    NotModified,
    /// The running executable could not be located.
    #[error(transparent)]
    Executable(#[from] ResolveError),
    /// A source configuration was incomplete or inconsistent.
    #[error("invalid source configuration: {0}")]
    Config(String),
    /// A source configuration document could not be decoded.
    #[error("source configuration decoding failed: {0}")]
    ConfigDecode(#[from] serde_json::Error),
}

impl SourceError {
    /// Helper for wrapping configuration failures.
    pub fn config(msg: impl Into<String>) -> Self {
        SourceError::Config(msg.into())
    }

    /// Whether this error means the signature payload had the wrong size.
    pub fn is_signature_size(&self) -> bool {
        matches!(self, SourceError::SignatureSize { .. })
    }

    /// Whether this error means no version timestamp was available.
    pub fn is_missing_version(&self) -> bool {
        matches!(self, SourceError::MissingVersion)
    }
}

#[cfg(feature = "aws")]
impl From<aws_sdk_s3::Error> for SourceError {
    fn from(err: aws_sdk_s3::Error) -> Self {
        SourceError::Aws(Box::new(err))
    }
}
