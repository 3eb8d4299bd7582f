use crate::config::Config;
use crate::models::{UpstreamResponse, VideoResult};
use anyhow::anyhow;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Ways a link resolution can fail. Each one ends the request; nothing is retried.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Transport failure, timeout, or a non-2xx reply from the extraction service.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// The service answered but could not extract the video.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("upstream returned no download link")]
    NoDownloadLink,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Builds the shared HTTP client. Per-call timeouts are applied on each request.
pub fn build_http_client() -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Turns a source video URL into a `VideoResult` via the extraction service.
///
/// Built from a configuration snapshot; holds no mutable state, so one resolver
/// may serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    client: Client,
    api_url: String,
    origin: String,
    timeout: Duration,
    default_title: String,
}

impl LinkResolver {
    pub fn new(client: Client, config: &Config) -> Self {
        LinkResolver {
            client,
            api_url: config.upstream_api_url.clone(),
            origin: config.upstream_origin.clone(),
            timeout: config.timeout(),
            default_title: config.default_title.clone(),
        }
    }

    /// Performs exactly one upstream call and normalizes its reply.
    pub async fn resolve(&self, source: &Url) -> Result<VideoResult, ResolveError> {
        tracing::info!("Resolving video link for URL: {}", source);

        let response = self
            .client
            .post(&self.api_url)
            .form(&[("url", source.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Upstream replied with status {} for {}", status, source);
            return Err(ResolveError::UpstreamUnavailable(format!(
                "upstream replied with status {}",
                status
            )));
        }

        let body = response.text().await.map_err(transport_error)?;
        let parsed: UpstreamResponse = serde_json::from_str(&body).map_err(|e| {
            ResolveError::ExtractionFailed(format!("upstream reply is not valid JSON: {}", e))
        })?;

        let result = self.normalize(&parsed)?;
        tracing::info!("Resolved '{}' to {}", result.title, result.download_url);
        Ok(result)
    }

    /// Validates an upstream reply and reshapes it into a `VideoResult`.
    pub fn normalize(&self, response: &UpstreamResponse) -> Result<VideoResult, ResolveError> {
        if !response.is_success() {
            return Err(ResolveError::ExtractionFailed(match response.code() {
                Some(code) => format!("upstream reported code {}", code),
                None => "upstream reply has no status code".to_string(),
            }));
        }
        let data = response
            .data()
            .ok_or_else(|| ResolveError::ExtractionFailed("upstream reply has no data".to_string()))?;

        let title = data.title().unwrap_or(&self.default_title).to_string();

        let download_url = first_candidate(data.download_candidates())
            .map(|link| absolutize(&self.origin, link))
            .ok_or(ResolveError::NoDownloadLink)?;

        let thumbnail = first_candidate(data.thumbnail_candidates())
            .map(|link| absolutize(&self.origin, link))
            .unwrap_or_default();

        Ok(VideoResult {
            title,
            thumbnail,
            download_url,
        })
    }
}

fn first_candidate<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates.into_iter().flatten().next()
}

/// Prefixes `origin` to links that are bare paths; absolute links pass through.
pub fn absolutize(origin: &str, link: &str) -> String {
    if link.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), link)
    } else {
        link.to_string()
    }
}

fn transport_error(err: reqwest::Error) -> ResolveError {
    if err.is_builder() {
        // A request that cannot be built points at our own configuration.
        return ResolveError::Internal(anyhow!(err).context("failed to build upstream request"));
    }
    if err.is_timeout() {
        tracing::warn!("Upstream request timed out: {}", err);
    } else {
        tracing::warn!("Upstream request failed: {}", err);
    }
    ResolveError::UpstreamUnavailable(err.to_string())
}
