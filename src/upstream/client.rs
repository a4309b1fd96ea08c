//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Issue a plain GET for the target URL (no inbound headers forwarded)
//! - Follow redirects with the client's default policy
//! - Buffer the full response body, optionally capped

use std::time::Duration;

use axum::body::Bytes;
use reqwest::Response;
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Errors raised while fetching from an upstream.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The client could not be constructed.
    #[error("failed to build upstream client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request could not be sent or no response arrived.
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The response body could not be read to completion.
    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),

    /// The response body exceeded the configured cap.
    #[error("upstream body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

/// Shared outbound client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    max_body_bytes: Option<usize>,
}

impl UpstreamClient {
    /// Build a client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build().map_err(FetchError::Build)?,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Send a GET request to `target`.
    ///
    /// A malformed URL surfaces here as [`FetchError::Request`].
    pub async fn fetch(&self, target: &str) -> Result<Response, FetchError> {
        self.client
            .get(target)
            .send()
            .await
            .map_err(FetchError::Request)
    }

    /// Read the whole response body into memory.
    pub async fn read_body(&self, mut response: Response) -> Result<Bytes, FetchError> {
        let Some(limit) = self.max_body_bytes else {
            return response.bytes().await.map_err(FetchError::Body);
        };

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::BodyTooLarge { limit });
        }

        let mut buf = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::Body)? {
            if buf.len() + chunk.len() > limit {
                return Err(FetchError::BodyTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }
}

/// Decode a body as UTF-8, replacing invalid sequences and dropping a leading BOM.
///
/// The declared charset is ignored.
pub fn decode_text(body: &[u8]) -> String {
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    String::from_utf8_lossy(body).into_owned()
}
