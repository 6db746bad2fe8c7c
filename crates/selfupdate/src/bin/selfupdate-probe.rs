//! Poll a configured update source and report what a self-updating binary
//! would see.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use selfupdate::{ExecutableResolver, Source, SourceConfig, TracingLogger, Version};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "selfupdate-probe", version, about)]
struct Args {
    /// JSON source configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Last known version as an RFC 3339 timestamp; defaults to the
    /// modification time of this binary
    #[arg(long)]
    since: Option<DateTime<Utc>>,

    /// Download the artifact to this path (the signature is written next to
    /// it with an `.ed25519` suffix)
    #[arg(long)]
    download: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let resolver = ExecutableResolver::new();

    let config = SourceConfig::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let source = config.build(&resolver, Arc::new(TracingLogger)).await?;

    let known = match args.since {
        Some(date) => Version::new(date),
        None => resolver.last_modified()?,
    };
    let remote = source.latest_version().await?;
    let newer = remote.is_newer_than(&known);
    println!("remote version: {}", remote.to_http_date());
    println!("known version:  {}", known.to_http_date());
    println!("update available: {newer}");

    let signature = source.fetch_signature().await?;
    tracing::info!(?signature, "signature has the expected size");

    if let Some(path) = args.download {
        let download = source.fetch(Some(&known)).await?;
        let announced = download.content_length;
        let mut reader = download.reader;
        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("creating {}", path.display()))?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;

        if let Some(announced) = announced.filter(|len| *len != written) {
            anyhow::bail!("expected {announced} bytes, received {written}");
        }

        let mut signature_path = path.into_os_string();
        signature_path.push(selfupdate::SIGNATURE_SUFFIX);
        tokio::fs::write(&signature_path, signature.as_bytes()).await?;
        println!("downloaded {written} bytes");
    }

    Ok(())
}
