use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ProbeError, ProbeResult};
use crate::models::IpLocation;

pub const DEFAULT_IP_LOOKUP_URL: &str = "https://ipapi.co/json/";

/// Coarse location from the caller's public IP address.
#[async_trait]
pub trait IpLocator: Send + Sync {
    async fn locate(&self) -> ProbeResult<IpLocation>;
}

pub struct HttpIpLocator {
    client: Client,
    url: String,
}

impl HttpIpLocator {
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

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpLookupResponse {
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    ip: Option<String>,
    error: bool,
    reason: Option<String>,
}

impl TryFrom<IpLookupResponse> for IpLocation {
    type Error = ProbeError;

    fn try_from(body: IpLookupResponse) -> Result<Self, Self::Error> {
        if body.error {
            return Err(ProbeError::InvalidResponse(
                body.reason.unwrap_or_else(|| "lookup service reported an error".into()),
            ));
        }
        if body.city.is_none() && body.region.is_none() && body.country_name.is_none() {
            return Err(ProbeError::InvalidResponse("no location fields".into()));
        }

        Ok(IpLocation {
            city: body.city.unwrap_or_default(),
            region: body.region.unwrap_or_default(),
            country: body.country_name.unwrap_or_default(),
            ip: body.ip.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl IpLocator for HttpIpLocator {
    async fn locate(&self) -> ProbeResult<IpLocation> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Http(status.as_u16()));
        }

        let body: IpLookupResponse = response.json().await?;
        IpLocation::try_from(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ProbeResult<IpLocation> {
        let body: IpLookupResponse = serde_json::from_str(json).unwrap();
        IpLocation::try_from(body)
    }

    #[test]
    fn test_full_response() {
        let location = parse(
            r#"{"ip": "203.0.113.9", "city": "Annapolis", "region": "Maryland",
                "country_name": "United States", "postal": "21401", "latitude": 38.97}"#,
        )
        .unwrap();

        assert_eq!(location.city, "Annapolis");
        assert_eq!(location.region, "Maryland");
        assert_eq!(location.country, "United States");
        assert_eq!(location.ip, "203.0.113.9");
    }

    #[test]
    fn test_error_response() {
        assert_eq!(
            parse(r#"{"error": true, "reason": "RateLimited"}"#),
            Err(ProbeError::InvalidResponse("RateLimited".into()))
        );
        assert!(parse(r#"{"ip": "203.0.113.9"}"#).is_err());
    }
}
