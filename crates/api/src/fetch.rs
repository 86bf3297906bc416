//! Download of files referenced by URL in a request body.

use std::time::Duration;

use reqwest::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("remote answered HTTP {0}")]
    HttpStatus(u16),

    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Parse a caller-supplied URL. Only `http` and `https` are fetched.
pub fn parse_source_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// HTTP client with a per-request timeout and a size cap on bodies.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl FileFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, max_bytes }
    }

    /// GET `url` and return the body. Non-2xx answers are errors.
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let mut response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let too_large = || FetchError::TooLarge {
            limit: self.max_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong; enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}
