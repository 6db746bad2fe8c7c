use crate::error::{Result, SourceError};
use crate::executable::ExecutableResolver;
use crate::logger::{self, Logger};
use crate::platform::{render_location, Platform};
use crate::signature::{read_signature, signature_location, DetachedSignature};
use crate::source::{Download, Source};
use crate::version::Version;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{Client, Response, StatusCode};
use std::io;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// Builder for [`HttpSource`].
#[derive(Default)]
pub struct HttpSourceBuilder<'a> {
    client: Option<Client>,
    resolver: Option<&'a ExecutableResolver>,
    logger: Option<Arc<dyn Logger>>,
}

impl<'a> HttpSourceBuilder<'a> {
    /// Provide a custom reqwest client instance, e.g. one with a timeout.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Resolver supplying the `{{.Executable}}` fact.
    pub fn resolver(mut self, resolver: &'a ExecutableResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Diagnostic sink.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Render `location` for the running platform and build the source.
    pub fn build(self, location: &str) -> HttpSource {
        let resolver = self.resolver.unwrap_or_else(|| ExecutableResolver::process());
        let logger = self.logger.unwrap_or_else(logger::noop);
        let url = render_location(location, &Platform::current(resolver), logger.as_ref());

        HttpSource {
            client: self.client.unwrap_or_default(),
            url,
            logger,
        }
    }
}

/// Source serving the artifact from a plain HTTP(S) URL, with its signature
/// at `${URL}.ed25519`.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
    logger: Arc<dyn Logger>,
}

impl HttpSource {
    /// Create a new builder.
    pub fn builder<'a>() -> HttpSourceBuilder<'a> {
        HttpSourceBuilder::default()
    }

    /// Source for `location` using `client` and the process-wide resolver.
    pub fn new(client: Client, location: &str) -> Self {
        Self::builder().client(client).build(location)
    }

    /// The rendered artifact URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Err(SourceError::NotModified);
        }
        Ok(response.error_for_status()?)
    }
}

fn body_reader(response: Response) -> impl AsyncRead + Send + 'static {
    StreamReader::new(response.bytes_stream().map_err(io::Error::other))
}

#[async_trait]
impl Source for HttpSource {
    async fn fetch(&self, known: Option<&Version>) -> Result<Download> {
        let mut request = self.client.get(&self.url);
        if let Some(version) = known.filter(|version| !version.is_zero()) {
            request = request.header(IF_MODIFIED_SINCE, version.to_http_date());
        }

        self.logger.debug(format_args!("fetching {}", self.url));
        let response = self.send(request).await?;
        let content_length = response.content_length();

        Ok(Download::new(body_reader(response), content_length))
    }

    async fn fetch_signature(&self) -> Result<DetachedSignature> {
        let url = signature_location(&self.url);
        self.logger.debug(format_args!("fetching signature {url}"));

        let response = self.send(self.client.get(&url)).await?;
        let reported = response.content_length();
        read_signature(reported, Box::pin(body_reader(response)))
            .await
            .inspect_err(|err| self.logger.error(format_args!("signature at {url}: {err}")))
    }

    async fn latest_version(&self) -> Result<Version> {
        let response = self.send(self.client.head(&self.url)).await?;
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .ok_or(SourceError::MissingVersion)?
            .to_str()
            .map_err(|err| SourceError::InvalidTimestamp(err.to_string()))?;

        Version::parse_http_date(last_modified)
    }
}
