//! Outbound HTTP probes used by the collector.

mod ip_lookup;
mod speed;

pub use ip_lookup::{HttpIpLocator, IpLocator, DEFAULT_IP_LOOKUP_URL};
pub use speed::{cache_busted_url, HttpLatencyProbe, LatencyProbe, DEFAULT_SPEED_TEST_URL};

use std::sync::Arc;

/// The network collaborators the collector calls into.
#[derive(Clone)]
pub struct Probes {
    pub latency: Arc<dyn LatencyProbe>,
    pub locator: Arc<dyn IpLocator>,
}

impl Probes {
    pub fn new(latency: Arc<dyn LatencyProbe>, locator: Arc<dyn IpLocator>) -> Self {
        Self { latency, locator }
    }

    /// HTTP probes sharing one connection pool.
    pub fn http(speed_test_url: &str, ip_lookup_url: &str) -> Self {
        let client = reqwest::Client::new();
        Self {
            latency: Arc::new(HttpLatencyProbe::with_client(client.clone(), speed_test_url)),
            locator: Arc::new(HttpIpLocator::with_client(client, ip_lookup_url)),
        }
    }
}
