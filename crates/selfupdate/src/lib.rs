//! Discovery, download and authentication inputs for self-updating binaries.
//!
//! A [`Source`] knows where a candidate replacement of the running executable
//! is published. It can report the artifact's modification time (the
//! [`Version`]), open the artifact as a stream and fetch the 64-byte detached
//! ed25519 signature published next to it at `<location>.ed25519`. Verifying
//! that signature and swapping the binary in are left to the caller; the
//! [`ExecutableResolver`] tells it which paths to use.
//!
//! Locations are templates rendered for the running platform, so one
//! configuration serves every build target:
//!
//! ```ignore
//! use selfupdate::{HttpSource, Source, Version};
//!
//! # async fn demo(last_seen: Version) -> selfupdate::Result<()> {
//! let source = HttpSource::new(
//!     reqwest::Client::new(),
//!     "https://example.com/releases/app-{{.OS}}-{{.Arch}}{{.Ext}}",
//! );
//!
//! let remote = source.latest_version().await?;
//! if remote.is_newer_than(&last_seen) {
//!     let signature = source.fetch_signature().await?;
//!     let download = source.fetch(Some(&last_seen)).await?;
//!     // hand `download.reader` and `signature` to the verifier and apply engine
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "aws")]
mod aws;
mod config;
mod error;
mod executable;
mod http;
pub mod logger;
#[cfg(feature = "minio")]
mod minio;
pub mod platform;
pub mod signature;
mod source;
mod version;

#[cfg(feature = "aws")]
pub use aws::AwsSource;
pub use config::SourceConfig;
pub use error::{Result, SourceError};
pub use executable::{ExecutablePaths, ExecutableResolver, ResolveError};
pub use http::{HttpSource, HttpSourceBuilder};
pub use logger::{Logger, NoopLogger, TracingLogger};
#[cfg(feature = "minio")]
pub use minio::MinioSource;
pub use platform::{render_location, Platform, TemplateError};
pub use signature::{DetachedSignature, SIGNATURE_LEN, SIGNATURE_SUFFIX};
pub use source::{ArtifactStream, Download, Source};
pub use version::Version;
