/// Why a best-effort probe produced nothing. Never surfaced to collector
/// callers: the collector logs it and falls back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} is not available on this platform")]
    Unavailable(&'static str),
    #[error("permission denied for {0}")]
    PermissionDenied(&'static str),
    #[error("{0} did not answer in time")]
    TimedOut(&'static str),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    Http(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProbeError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            ProbeError::Http(status.as_u16())
        } else {
            ProbeError::Network(err.to_string())
        }
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
