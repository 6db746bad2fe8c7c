//! Detached artifact signatures.
//!
//! The signature for an artifact at location `L` always lives at
//! `L + ".ed25519"` and holds exactly 64 raw bytes. Every backend obtains the
//! raw payload its own way and then hands it to [`read_signature`], which
//! enforces the size before anything reaches a verifier.

use crate::error::{Result, SourceError};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Length of an ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Suffix appended to an artifact location to find its signature.
pub const SIGNATURE_SUFFIX: &str = ".ed25519";

/// Location of the detached signature for the artifact at `location`.
pub fn signature_location(location: &str) -> String {
    format!("{location}{SIGNATURE_SUFFIX}")
}

/// Exactly 64 signature bytes, not yet verified.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DetachedSignature([u8; SIGNATURE_LEN]);

impl DetachedSignature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Validate and wrap a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SIGNATURE_LEN] =
            bytes.try_into().map_err(|_| SourceError::SignatureSize {
                actual: bytes.len() as u64,
            })?;
        Ok(Self(array))
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Copy out the raw bytes.
    pub fn to_bytes(self) -> [u8; SIGNATURE_LEN] {
        self.0
    }
}

impl AsRef<[u8]> for DetachedSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DetachedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DetachedSignature(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Read a signature payload, rejecting it unless both the length reported by
/// the transport (when there is one) and the number of bytes actually read
/// are 64. At most 65 bytes are read, so an oversized payload is reported as
/// 65 bytes long when the transport did not announce its length.
pub async fn read_signature<R>(reported_len: Option<u64>, reader: R) -> Result<DetachedSignature>
where
    R: AsyncRead + Unpin,
{
    if let Some(len) = reported_len {
        if len != SIGNATURE_LEN as u64 {
            return Err(SourceError::SignatureSize { actual: len });
        }
    }

    let mut buf = Vec::with_capacity(SIGNATURE_LEN + 1);
    reader
        .take(SIGNATURE_LEN as u64 + 1)
        .read_to_end(&mut buf)
        .await?;

    DetachedSignature::from_slice(&buf)
}
