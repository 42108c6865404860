use async_trait::async_trait;
use reqwest::{header::CACHE_CONTROL, Client};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{ProbeError, ProbeResult};

pub const DEFAULT_SPEED_TEST_URL: &str = "https://www.google.com/images/phd/px.gif";

/// Measures how long it takes to fetch a small reference resource.
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    async fn measure(&self) -> ProbeResult<Duration>;
}

pub struct HttpLatencyProbe {
    client: Client,
    url: String,
}

impl HttpLatencyProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

/// Append a unique query parameter so no cache can answer the request.
pub fn cache_busted_url(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}cb={token}")
}

#[async_trait]
impl LatencyProbe for HttpLatencyProbe {
    async fn measure(&self) -> ProbeResult<Duration> {
        let url = cache_busted_url(&self.url, &Uuid::new_v4().simple().to_string());

        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Http(status.as_u16()));
        }

        // The body is part of the measurement.
        response.bytes().await?;
        Ok(started.elapsed())
    }
}
